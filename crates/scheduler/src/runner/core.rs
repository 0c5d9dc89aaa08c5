use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use chrono::Utc;
use tracing::debug;

use crate::job::JobSpec;
use crate::metrics::SchedulerMetrics;
use crate::queue::DueQueue;
use crate::registry::TaskRegistry;
use crate::types::{ScheduleError, SchedulerConfig, TaskId, TaskSnapshot};

/// Registry and due queue behind the single scheduler mutex.
///
/// Every mutation of task state goes through one short critical section over
/// this pair, so the queue can never refer to an id the registry disagrees
/// about.
pub(crate) struct SchedulerState {
    pub registry: TaskRegistry,
    pub queue: DueQueue,
}

/// The task scheduler. Owns the due queue and task registry, drives the
/// dispatch loop, and executes job bodies on a bounded rayon pool.
///
/// Handles are cheap to clone (shared internals); the owning process
/// constructs one scheduler and passes clones to every subsystem that
/// schedules work.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Registry + due queue, one mutex for both.
    pub(super) state: Arc<Mutex<SchedulerState>>,
    /// Scheduler metrics.
    pub(super) metrics: Arc<RwLock<SchedulerMetrics>>,
    /// Worker pool for job bodies. Lives on the instance so stopping the
    /// dispatcher never waits on slow job bodies.
    pub(super) pool: Arc<rayon::ThreadPool>,
    /// Shutdown signal for the dispatch loop.
    pub(super) shutdown: Arc<AtomicBool>,
    /// Active worker count (for utilization tracking).
    pub(super) active_workers: Arc<AtomicUsize>,
    /// Dispatcher thread handle when started via `start()`.
    pub(super) dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Scheduler {
    /// Create a new scheduler with the given config.
    pub fn new(config: SchedulerConfig) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.resolved_worker_threads())
            .thread_name(|i| format!("sched-worker-{i}"))
            .build()
            .expect("Failed to build rayon thread pool");

        Self {
            config,
            state: Arc::new(Mutex::new(SchedulerState {
                registry: TaskRegistry::new(),
                queue: DueQueue::new(),
            })),
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
            pool: Arc::new(pool),
            shutdown: Arc::new(AtomicBool::new(false)),
            active_workers: Arc::new(AtomicUsize::new(0)),
            dispatcher: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedule a task. Validates the spec, stores a `Pending` record, and
    /// inserts it into the due queue. Never blocks on the dispatcher.
    pub fn schedule(&self, spec: JobSpec) -> Result<TaskId, ScheduleError> {
        let now = Utc::now();
        if spec.execute_at < now - self.config.past_grace() {
            return Err(ScheduleError::ExecuteAtTooOld {
                execute_at: spec.execute_at,
                grace_secs: self.config.past_grace_secs,
            });
        }
        if let Some(interval) = spec.repeat_interval {
            if interval <= chrono::Duration::zero() {
                return Err(ScheduleError::NonPositiveInterval);
            }
        }

        let name = spec.name.clone();
        let execute_at = spec.execute_at;
        let priority = spec.priority;

        let mut state = self.state.lock().unwrap();
        let id = state.registry.insert(spec);
        state.queue.push(execute_at, priority, id);
        drop(state);

        debug!(id, %name, %execute_at, ?priority, "task scheduled");
        Ok(id)
    }

    /// Cancel a task. `false` for unknown ids and tasks already terminal.
    /// Cancelling a `Running` task only suppresses rescheduling; the
    /// in-flight invocation is never aborted.
    pub fn cancel(&self, id: TaskId) -> bool {
        let cancelled = self.state.lock().unwrap().registry.cancel(id);
        if cancelled {
            debug!(id, "task cancelled");
        }
        cancelled
    }

    /// Read-only snapshot of one task.
    pub fn get(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.state
            .lock()
            .unwrap()
            .registry
            .get(id)
            .map(|r| r.snapshot())
    }

    /// Snapshots of all `Pending` tasks, ordered by id.
    pub fn list_pending(&self) -> Vec<TaskSnapshot> {
        self.state.lock().unwrap().registry.list_pending()
    }

    /// Drop all terminal task records; returns how many were removed.
    pub fn purge_completed(&self) -> usize {
        self.state.lock().unwrap().registry.purge_completed()
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.read().unwrap().clone()
    }

    /// Get an Arc to the shutdown flag (for external shutdown signaling).
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
            pool: Arc::clone(&self.pool),
            shutdown: Arc::clone(&self.shutdown),
            active_workers: Arc::clone(&self.active_workers),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}
