//! Clock abstraction for determinism.
//!
//! Session behaviour depends on time only through the round deadline and the
//! reveal window. Both are computed from a single read of this clock and
//! persisted with the resulting event, so a resumed session reuses them
//! instead of reading again.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
