//! Test clock — deterministic `Clock` implementation for tests.
//!
//! Session timers run on tokio time, so a fixed wall clock combined with a
//! paused tokio runtime still lets deadlines and reveal windows elapse.

use chrono::{DateTime, TimeZone, Utc};
use quizrun_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock pinned to 2026-01-15 10:00:00 UTC.
    ///
    /// # Panics
    ///
    /// Never; the instant is a valid UTC timestamp.
    #[must_use]
    pub fn reference() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
                .single()
                .expect("reference instant is unambiguous"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
