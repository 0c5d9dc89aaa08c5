use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::types::{Priority, TaskId};

/// Error type returned by job bodies.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job failed: {0}")]
    Failed(String),
}

impl JobError {
    /// Shorthand for a failure with a message.
    pub fn failed(msg: impl Into<String>) -> Self {
        JobError::Failed(msg.into())
    }
}

/// Scheduler-side information handed to a job invocation.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Id of the task being run.
    pub task_id: TaskId,
    /// Human label the task was scheduled under.
    pub name: String,
    /// The occurrence this invocation corresponds to.
    pub scheduled_for: DateTime<Utc>,
}

/// A unit of work the scheduler can invoke.
///
/// Implementations wrap specific game jobs (daily resets, resource
/// regeneration ticks, matchmaking sweeps) and are opaque to the scheduler:
/// it only ever calls `run` and records the outcome. Jobs carry their own
/// parameters; the scheduler forwards nothing beyond the [`JobContext`].
pub trait Job: Send + Sync {
    /// Execute one occurrence. An `Err` marks the occurrence `Failed`;
    /// a recurring task stays on schedule regardless.
    fn run(&self, ctx: &JobContext) -> Result<(), JobError>;
}

/// Adapter wrapping a closure as a [`Job`].
pub struct JobFn {
    f: Box<dyn Fn(&JobContext) -> Result<(), JobError> + Send + Sync>,
}

impl JobFn {
    pub fn new(f: impl Fn(&JobContext) -> Result<(), JobError> + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Job for JobFn {
    fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        (self.f)(ctx)
    }
}

/// Submission record for `Scheduler::schedule`.
///
/// `priority` defaults to `Normal` and `repeat_interval` to one-shot;
/// builder-style setters cover the rest.
#[derive(Clone)]
pub struct JobSpec {
    pub name: String,
    pub job: Arc<dyn Job>,
    pub execute_at: DateTime<Utc>,
    pub priority: Priority,
    pub repeat_interval: Option<Duration>,
}

impl JobSpec {
    /// Create a one-shot spec with `Normal` priority.
    pub fn new(name: impl Into<String>, job: impl Job + 'static, execute_at: DateTime<Utc>) -> Self {
        Self::from_shared(name, Arc::new(job), execute_at)
    }

    /// Create a spec from an already-shared job handle.
    pub fn from_shared(
        name: impl Into<String>,
        job: Arc<dyn Job>,
        execute_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            job,
            execute_at,
            priority: Priority::Normal,
            repeat_interval: None,
        }
    }

    /// Set the dispatch priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Make the task recurring with the given interval.
    pub fn repeating(mut self, every: Duration) -> Self {
        self.repeat_interval = Some(every);
        self
    }
}
