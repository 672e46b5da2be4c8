//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time.
///
/// Session expiry and every event timestamp read the clock through this trait
/// so tests can pin "now".
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
