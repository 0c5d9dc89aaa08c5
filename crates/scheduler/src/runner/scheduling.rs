use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::types::TaskId;

use super::Scheduler;

impl Scheduler {
    /// Drain every entry due at `now`, in dispatch order.
    ///
    /// Entries for tasks that are no longer `Pending` (cancelled after
    /// insertion) still come out here; the executor's pre-invocation check
    /// drops them.
    pub(crate) fn drain_due(&self, now: DateTime<Utc>) -> Vec<TaskId> {
        self.state.lock().unwrap().queue.pop_due(now)
    }

    /// How long the dispatch loop should sleep: until the next scheduled
    /// entry, capped at one tick.
    pub(crate) fn next_wake(&self, now: DateTime<Utc>) -> StdDuration {
        let tick = self.config.tick_interval();
        let next = self.state.lock().unwrap().queue.peek_next_time();
        match next {
            Some(at) if at > now => (at - now).to_std().unwrap_or(tick).min(tick),
            // Something is already due; go straight into the next drain.
            Some(_) => StdDuration::ZERO,
            None => tick,
        }
    }
}

/// Next occurrence for a recurring task: the previous `next_run` advanced by
/// whole intervals to the first point strictly after `now`.
///
/// Anchoring on the previous occurrence (never on `now`) keeps the cadence
/// drift-free; advancing by whole multiples skips missed ticks so a stalled
/// scheduler runs only the most recent due occurrence instead of a
/// catch-up burst.
pub(crate) fn advance_next_run(
    prev: DateTime<Utc>,
    interval: Duration,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let interval_ms = interval.num_milliseconds().max(1);
    let behind_ms = (now - prev).num_milliseconds();
    let steps = if behind_ms < 0 {
        1
    } else {
        behind_ms / interval_ms + 1
    };
    prev + Duration::milliseconds(interval_ms.saturating_mul(steps))
}
