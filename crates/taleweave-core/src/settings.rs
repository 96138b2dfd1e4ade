//! Persisted audio and narration preferences.
//!
//! The narrative state machine owns these values; the media coordinators
//! hold push-updated copies.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lower bound for speech rate and pitch.
pub const SPEECH_FACTOR_MIN: f32 = 0.5;
/// Upper bound for speech rate and pitch.
pub const SPEECH_FACTOR_MAX: f32 = 2.0;

/// Audio mixer preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    /// Whether all audio is muted.
    pub is_muted: bool,
    /// Master gain in `[0, 1]`.
    pub master_volume: f32,
    /// Background music gain in `[0, 1]`.
    pub music_volume: f32,
    /// Sound effect gain in `[0, 1]`.
    pub effects_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            is_muted: false,
            master_volume: 0.5,
            music_volume: 0.3,
            effects_volume: 0.7,
        }
    }
}

impl AudioSettings {
    /// Effective volume of the background music channel.
    #[must_use]
    pub fn music_level(&self) -> f32 {
        (self.music_volume * self.master_volume).clamp(0.0, 1.0)
    }

    /// Effective volume of an effect played at `relative` volume.
    #[must_use]
    pub fn effect_level(&self, relative: f32) -> f32 {
        (relative * self.effects_volume * self.master_volume).clamp(0.0, 1.0)
    }
}

/// Text-to-speech preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationSettings {
    /// Whether narration is available at all.
    pub enabled: bool,
    /// Index into the engine's voice list, once the player has picked a
    /// voice. `None` narrates with the default voice.
    pub voice_index: Option<usize>,
    /// Speech rate in `[0.5, 2]`.
    pub rate: f32,
    /// Speech pitch in `[0.5, 2]`.
    pub pitch: f32,
    /// Speech volume in `[0, 1]`.
    pub volume: f32,
    /// Whether node text is narrated automatically on entry.
    pub autoplay: bool,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            voice_index: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            autoplay: true,
        }
    }
}

/// Clamps a gain to `[0, 1]`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `value` is NaN.
pub fn unit_volume(value: f32) -> Result<f32, DomainError> {
    clamp_checked(value, 0.0, 1.0)
}

/// Clamps a speech rate or pitch to `[0.5, 2]`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `value` is NaN.
pub fn speech_factor(value: f32) -> Result<f32, DomainError> {
    clamp_checked(value, SPEECH_FACTOR_MIN, SPEECH_FACTOR_MAX)
}

fn clamp_checked(value: f32, min: f32, max: f32) -> Result<f32, DomainError> {
    if value.is_nan() {
        return Err(DomainError::Validation(
            "setting value must be a number".to_owned(),
        ));
    }
    Ok(value.clamp(min, max))
}
