//! Settings push interfaces.
//!
//! The narrative state machine is the source of truth for settings; after
//! each settings action it pushes the new value into the live media
//! coordinators through these traits.

use crate::settings::{AudioSettings, NarrationSettings};

/// Live audio mixer controls.
pub trait AudioControl: Send + Sync {
    /// Replaces the cached settings wholesale (startup reconciliation).
    fn apply_settings(&self, settings: &AudioSettings);

    /// Sets the master gain.
    fn set_master_volume(&self, volume: f32);

    /// Sets the music gain.
    fn set_music_volume(&self, volume: f32);

    /// Sets the effects gain for future effects.
    fn set_effects_volume(&self, volume: f32);

    /// Flips the mute flag and returns the new value.
    fn toggle_mute(&self) -> bool;
}

/// Live narration controls.
pub trait NarrationControl: Send + Sync {
    /// Replaces the cached preferences wholesale (startup reconciliation).
    fn apply_settings(&self, settings: &NarrationSettings);

    /// Sets the speech rate.
    fn set_rate(&self, rate: f32);

    /// Sets the speech pitch.
    fn set_pitch(&self, pitch: f32);

    /// Sets the speech volume.
    fn set_volume(&self, volume: f32);

    /// Selects the voice at `index` in the engine's voice list.
    fn set_voice(&self, index: usize);
}
