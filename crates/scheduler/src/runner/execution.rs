use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::job::JobContext;
use crate::types::{TaskId, TaskStatus};

use super::scheduling::advance_next_run;
use super::Scheduler;

impl Scheduler {
    /// Run the dispatch loop on the calling thread until shutdown is
    /// signaled.
    ///
    /// Each tick drains all due entries and hands them, in due-queue order,
    /// to the worker pool. Job bodies never run on this thread, so one slow
    /// or broken job cannot stall dispatch of the others.
    pub fn run(&self) {
        info!(
            workers = self.config.resolved_worker_threads(),
            tick_ms = self.config.tick_interval_ms,
            "Scheduler starting"
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let now = Utc::now();
            let due = self.drain_due(now);

            if !due.is_empty() {
                debug!(count = due.len(), "dispatching due tasks");
            }

            // Hand off in queue order; completion order is up to the pool.
            for id in due {
                let worker = self.clone();
                self.pool.spawn(move || worker.execute_one(id));
            }

            if let Ok(mut m) = self.metrics.write() {
                let active = self.active_workers.load(Ordering::Relaxed);
                m.worker_utilization =
                    active as f64 / self.config.resolved_worker_threads() as f64;
            }

            std::thread::sleep(self.next_wake(Utc::now()));
        }

        info!("Scheduler stopped");
    }

    /// Start the dispatch loop on a dedicated thread. Idempotent.
    pub fn start(&self) {
        let mut dispatcher = self.dispatcher.lock().unwrap();
        if let Some(handle) = dispatcher.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        self.shutdown.store(false, Ordering::Relaxed);
        let scheduler = self.clone();
        let handle = std::thread::Builder::new()
            .name("sched-dispatch".to_string())
            .spawn(move || scheduler.run())
            .expect("Failed to spawn dispatcher thread");
        *dispatcher = Some(handle);
    }

    /// Stop the dispatch loop and join its thread. Idempotent.
    ///
    /// Waits only for the dispatcher to finish handing off; job bodies
    /// already on the pool keep running to completion on their workers.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.dispatcher.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("dispatcher thread panicked before join");
            }
        }
    }

    /// Worker-side execution of one dispatched task.
    pub(crate) fn execute_one(&self, id: TaskId) {
        let now = Utc::now();

        // Pre-invocation check: the entry may have been cancelled (or the
        // record purged) between popping and this point.
        let (job, ctx) = {
            let mut state = self.state.lock().unwrap();
            let Some(record) = state.registry.get_mut(id) else {
                return;
            };
            if record.status != TaskStatus::Pending {
                debug!(id, status = ?record.status, "skipping non-pending task");
                return;
            }
            record.status = TaskStatus::Running;
            record.last_run = Some(now);
            let ctx = JobContext {
                task_id: id,
                name: record.name.clone(),
                scheduled_for: record.next_run.unwrap_or(record.execute_at),
            };
            (Arc::clone(&record.job), ctx)
        };

        self.active_workers.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        // Job bodies are caller code; contain both Err returns and panics.
        let outcome = match catch_unwind(AssertUnwindSafe(|| job.run(&ctx))) {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(payload) => Err(panic_message(payload)),
        };
        let duration = started.elapsed();

        let name = ctx.name.clone();
        let failed = outcome.is_err();
        {
            let mut guard = self.state.lock().unwrap();
            let state = &mut *guard;
            if let Some(record) = state.registry.get_mut(id) {
                match outcome {
                    Ok(()) => {
                        record.status = TaskStatus::Completed;
                        record.error = None;
                        debug!(id, %name, ?duration, "task completed");
                    }
                    Err(message) => {
                        warn!(id, %name, error = %message, "task failed");
                        record.status = TaskStatus::Failed;
                        record.error = Some(message);
                    }
                }

                // Recurring tasks go straight back to Pending unless a
                // cancel arrived mid-flight. A Failed occurrence does not
                // cancel future occurrences.
                if let Some(interval) = record.repeat_interval {
                    if record.cancel_requested {
                        debug!(id, %name, "cancel requested mid-run, not rescheduled");
                    } else {
                        let prev = record.next_run.unwrap_or(record.execute_at);
                        let next = advance_next_run(prev, interval, Utc::now());
                        record.next_run = Some(next);
                        record.execute_at = next;
                        record.status = TaskStatus::Pending;
                        record.error = None;
                        let priority = record.priority;
                        state.queue.push(next, priority, id);
                        debug!(id, %name, %next, "recurring task rescheduled");
                    }
                }
            }
        }

        if let Ok(mut m) = self.metrics.write() {
            m.record_execution(&name, duration, failed);
        }
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Best-effort message extraction from a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".to_string()
    }
}
