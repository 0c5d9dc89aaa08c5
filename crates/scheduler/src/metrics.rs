use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics exposed to admin surfaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Total invocations by task name (successes and failures).
    pub tasks_executed: HashMap<String, u64>,
    /// Failed invocations by task name.
    pub tasks_failed: HashMap<String, u64>,
    /// Average invocation duration by task name.
    pub avg_task_duration: HashMap<String, Duration>,
    /// Last invocation start time by task name.
    pub last_run: HashMap<String, DateTime<Utc>>,
    /// Worker utilization ratio (0.0 - 1.0).
    pub worker_utilization: f64,
}

impl SchedulerMetrics {
    /// Record one invocation.
    pub fn record_execution(&mut self, task_name: &str, duration: Duration, failed: bool) {
        *self.tasks_executed.entry(task_name.to_string()).or_default() += 1;
        if failed {
            *self.tasks_failed.entry(task_name.to_string()).or_default() += 1;
        }
        self.last_run.insert(task_name.to_string(), Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_executed[task_name];
        let prev_avg = self
            .avg_task_duration
            .get(task_name)
            .copied()
            .unwrap_or_default();
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
        self.avg_task_duration.insert(task_name.to_string(), new_avg);
    }
}
