//! Wall-clock source for save timestamps.

use chrono::{DateTime, Utc};

/// Supplies the `savedAt` time of persisted snapshots. Injected so tests
/// can pin it.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
