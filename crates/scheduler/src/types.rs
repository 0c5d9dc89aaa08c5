use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Task identifier. Allocated as a monotonically increasing sequence;
/// also serves as the final scheduling tie-break (first scheduled wins).
pub type TaskId = u64;

/// Task urgency level.
///
/// Scheduling never uses declaration order; the heap key is built from
/// [`Priority::rank`], where `Critical` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Housekeeping that tolerates delay (cleanup sweeps, reports).
    Low,
    /// Default for periodic game jobs.
    Normal,
    /// Time-sensitive jobs (matchmaking sweeps, war status checks).
    High,
    /// Must dispatch before anything else due at the same instant
    /// (daily resets, maintenance cutovers).
    Critical,
}

impl Priority {
    /// Heap rank: lower sorts first. `Critical=0`, `High=1`, `Normal=2`, `Low=3`.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

/// Task lifecycle status.
///
/// Allowed transitions: `Pending -> Running`, `Running -> Completed`,
/// `Running -> Failed`, `Pending -> Cancelled`. A recurring task returns to
/// `Pending` when it is re-inserted for its next occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether this status ends a one-shot task's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Read-only view of a task record, exported to admin/metrics surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub execute_at: DateTime<Utc>,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    /// Failure message from the most recent occurrence, set only on `Failed`.
    pub error: Option<String>,
}

/// Error rejected synchronously at `schedule()` time. No task record is
/// created when scheduling fails.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("execute_at {execute_at} is more than {grace_secs}s in the past")]
    ExecuteAtTooOld {
        execute_at: DateTime<Utc>,
        grace_secs: u64,
    },
    #[error("repeat_interval must be positive")]
    NonPositiveInterval,
}

/// Error loading a scheduler config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads for job bodies. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Dispatcher wake interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// How far in the past `execute_at` may lie before `schedule()` rejects it.
    #[serde(default = "default_past_grace")]
    pub past_grace_secs: u64,
}

fn default_worker_threads() -> usize {
    4
}
fn default_tick_interval() -> u64 {
    100
}
fn default_past_grace() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            tick_interval_ms: default_tick_interval(),
            past_grace_secs: default_past_grace(),
        }
    }
}

impl SchedulerConfig {
    /// Load config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    /// Dispatcher tick as a std `Duration`.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    /// Grace window for past `execute_at` values.
    pub fn past_grace(&self) -> Duration {
        Duration::seconds(self.past_grace_secs as i64)
    }
}
