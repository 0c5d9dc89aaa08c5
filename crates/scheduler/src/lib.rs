//! Priority-aware recurring task scheduler for periodic game-server jobs.
//!
//! Callers submit [`Job`] implementations with an execution time, a
//! priority, and an optional repeat interval; a dedicated dispatcher thread
//! drains due tasks in deterministic `(time, priority, id)` order and runs
//! their bodies on a bounded worker pool. Failures are captured per task and
//! never disturb dispatch; recurring tasks are re-anchored on their previous
//! occurrence so the cadence cannot drift.
//!
//! The scheduler is in-memory and per-process: persistence, HTTP surfaces,
//! and the job bodies themselves belong to the embedding service.

pub mod job;
pub mod metrics;
pub mod queue;
mod registry;
pub mod runner;
pub mod types;

pub use job::{Job, JobContext, JobError, JobFn, JobSpec};
pub use metrics::SchedulerMetrics;
pub use queue::DueQueue;
pub use runner::Scheduler;
pub use types::{
    ConfigError, Priority, ScheduleError, SchedulerConfig, TaskId, TaskSnapshot, TaskStatus,
};
