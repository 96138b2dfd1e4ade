//! Audio coordinator tuning.

use std::time::Duration;

/// Crossfade timing and effect pool bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    /// Interval between crossfade steps.
    pub fade_tick: Duration,
    /// Volume change per step, as a fraction of full scale.
    pub fade_step: f32,
    /// Distinct effect sources kept before the least recently used is evicted.
    pub effect_cache_uris: usize,
    /// Concurrent handles kept per effect source.
    pub effect_handles_per_uri: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fade_tick: Duration::from_millis(100),
            fade_step: 0.05,
            effect_cache_uris: 32,
            effect_handles_per_uri: 4,
        }
    }
}
