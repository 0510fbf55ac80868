//! Room deadlines.
//!
//! A deadline is an `Option<Instant>` polled inside the room's `select!`.
//! Re-arming overwrites it, so a replaced timer can never fire; a deadline
//! that fires re-checks its guard before acting.

use std::time::Duration;

use tokio::time::Instant;

/// Resolves at `deadline`, or never when there is none.
pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Which phase a round timer guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundTimerKind {
    /// Fires while players are still choosing.
    Choice,
    /// Fires while the tsar is still deciding.
    Verdict,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RoundTimer {
    pub kind: RoundTimerKind,
    started: Instant,
    limit: Duration,
    pub deadline: Instant,
}

impl RoundTimer {
    /// A timer of `limit` that fires `grace` after the limit runs out.
    pub fn arm(kind: RoundTimerKind, limit: Duration, grace: Duration, now: Instant) -> Self {
        Self {
            kind,
            started: now,
            limit,
            deadline: now + limit + grace,
        }
    }

    /// Whole seconds left of the advertised limit, rounded to nearest.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        let remaining = self.limit.saturating_sub(elapsed);
        let millis = remaining.as_millis().saturating_add(500) / 1000;
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}
