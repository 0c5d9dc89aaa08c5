use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::job::{Job, JobSpec};
use crate::types::{Priority, TaskId, TaskSnapshot, TaskStatus};

/// The single authoritative record for one scheduled task.
///
/// Owned exclusively by the registry; the due queue refers to tasks by id.
pub(crate) struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub job: Arc<dyn Job>,
    pub priority: Priority,
    pub execute_at: DateTime<Utc>,
    pub repeat_interval: Option<Duration>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub error: Option<String>,
    /// Set when `cancel()` arrives while the task is `Running`; suppresses
    /// rescheduling without aborting the in-flight invocation.
    pub cancel_requested: bool,
}

impl TaskRecord {
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            priority: self.priority,
            execute_at: self.execute_at,
            next_run: self.next_run,
            last_run: self.last_run,
            error: self.error.clone(),
        }
    }
}

/// Owns all task records; allocates ids.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    tasks: HashMap<TaskId, TaskRecord>,
    next_id: TaskId,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            next_id: 1,
        }
    }

    /// Store a new `Pending` record for `spec` and return its id.
    pub fn insert(&mut self, spec: JobSpec) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert(
            id,
            TaskRecord {
                id,
                name: spec.name,
                job: spec.job,
                priority: spec.priority,
                execute_at: spec.execute_at,
                repeat_interval: spec.repeat_interval,
                last_run: None,
                next_run: Some(spec.execute_at),
                status: TaskStatus::Pending,
                error: None,
                cancel_requested: false,
            },
        );
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord> {
        self.tasks.get_mut(&id)
    }

    /// Cancel a task. `false` for unknown ids and tasks already terminal.
    ///
    /// A `Pending` task moves straight to `Cancelled`; a `Running` task
    /// finishes its current invocation and is only barred from rescheduling.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let Some(record) = self.tasks.get_mut(&id) else {
            return false;
        };
        match record.status {
            TaskStatus::Pending => {
                record.status = TaskStatus::Cancelled;
                true
            }
            TaskStatus::Running => {
                record.cancel_requested = true;
                true
            }
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => false,
        }
    }

    /// Snapshots of all `Pending` tasks, ordered by id.
    pub fn list_pending(&self) -> Vec<TaskSnapshot> {
        let mut pending: Vec<TaskSnapshot> = self
            .tasks
            .values()
            .filter(|r| r.status == TaskStatus::Pending)
            .map(TaskRecord::snapshot)
            .collect();
        pending.sort_by_key(|s| s.id);
        pending
    }

    /// Drop all terminal records; returns how many were removed.
    pub fn purge_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, r| !r.status.is_terminal());
        before - self.tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}
