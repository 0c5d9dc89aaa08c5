//! job-worker -- standalone scheduler process driving periodic game jobs.
//!
//! Wires a scheduler with the recurring sweeps a game shard needs (war
//! status checks, territory updates, stale-war cleanup, daily reset) plus a
//! periodic JSON metrics report for the admin surface, then blocks in the
//! dispatch loop. Real deployments embed the scheduler in the game server
//! and register their own jobs; this binary doubles as a smoke-test harness
//! and a reference for the wiring.

use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use tracing::{info, warn};

use questline_scheduler::{JobFn, JobSpec, Priority, Scheduler, SchedulerConfig};

/// Standalone job scheduler worker.
#[derive(Parser, Debug)]
#[command(name = "job-worker", version, about)]
struct Cli {
    /// Path to scheduler.toml config file.
    #[arg(long, env = "SCHEDULER_CONFIG", default_value = "config/scheduler.toml")]
    config: String,

    /// Override the worker thread count from the config.
    #[arg(long, env = "SCHEDULER_WORKERS")]
    workers: Option<usize>,

    /// Override the dispatcher tick interval (milliseconds).
    #[arg(long, env = "SCHEDULER_TICK_MS")]
    tick_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match SchedulerConfig::from_file(&cli.config) {
        Ok(cfg) => {
            info!(path = %cli.config, "loaded scheduler config");
            cfg
        }
        Err(e) => {
            warn!(error = %e, path = %cli.config, "failed to load config, using defaults");
            SchedulerConfig::default()
        }
    };
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
    }

    let scheduler = Scheduler::new(config);
    register_game_jobs(&scheduler)?;

    // Blocks until the process is terminated.
    scheduler.run();
    Ok(())
}

/// Register the standing periodic jobs for one game shard.
fn register_game_jobs(scheduler: &Scheduler) -> anyhow::Result<()> {
    let now = Utc::now();

    scheduler.schedule(
        JobSpec::new(
            "war_status_sweep",
            JobFn::new(|ctx| {
                info!(task = %ctx.name, "checking active war statuses");
                Ok(())
            }),
            now + Duration::seconds(60),
        )
        .with_priority(Priority::High)
        .repeating(Duration::seconds(60)),
    )?;

    scheduler.schedule(
        JobSpec::new(
            "territory_update",
            JobFn::new(|ctx| {
                info!(task = %ctx.name, "recomputing territory control");
                Ok(())
            }),
            now + Duration::seconds(300),
        )
        .repeating(Duration::seconds(300)),
    )?;

    scheduler.schedule(
        JobSpec::new(
            "stale_war_cleanup",
            JobFn::new(|ctx| {
                info!(task = %ctx.name, "cleaning up stale wars");
                Ok(())
            }),
            now + Duration::seconds(3600),
        )
        .with_priority(Priority::Low)
        .repeating(Duration::seconds(3600)),
    )?;

    // Daily reset fires at the next midnight UTC, then every 24h.
    let tomorrow = (now + Duration::days(1)).date_naive();
    let midnight = Utc.from_utc_datetime(
        &tomorrow
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time"),
    );
    scheduler.schedule(
        JobSpec::new(
            "daily_reset",
            JobFn::new(|ctx| {
                info!(task = %ctx.name, "running daily reset");
                Ok(())
            }),
            midnight,
        )
        .with_priority(Priority::Critical)
        .repeating(Duration::days(1)),
    )?;

    // Metrics report for the admin surface.
    let handle = scheduler.clone();
    scheduler.schedule(
        JobSpec::new(
            "metrics_report",
            JobFn::new(move |_| {
                let metrics = handle.metrics();
                match serde_json::to_string(&metrics) {
                    Ok(json) => info!(metrics = %json, "scheduler metrics"),
                    Err(e) => warn!(error = %e, "failed to serialize metrics"),
                }
                Ok(())
            }),
            now + Duration::seconds(60),
        )
        .with_priority(Priority::Low)
        .repeating(Duration::seconds(60)),
    )?;

    info!(pending = scheduler.list_pending().len(), "game jobs registered");
    Ok(())
}
