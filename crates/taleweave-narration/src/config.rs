//! Narration coordinator tuning.

use std::time::Duration;

/// Start delay and status channel sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationConfig {
    /// Delay between `speak` and handing the utterance to the engine. A
    /// superseding `speak` or `stop` inside this window means the engine
    /// never sees the superseded text.
    pub start_delay: Duration,
    /// Capacity of the status broadcast channel.
    pub event_capacity: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(100),
            event_capacity: 64,
        }
    }
}
