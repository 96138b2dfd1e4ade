//! Recording settings controls — capture what the state machine pushes into
//! the media coordinators.

use std::sync::Mutex;

use taleweave_core::control::{AudioControl, NarrationControl};
use taleweave_core::settings::{AudioSettings, NarrationSettings};

/// A push received by `RecordingAudioControl`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCall {
    /// `apply_settings`.
    Apply(AudioSettings),
    /// `set_master_volume`.
    Master(f32),
    /// `set_music_volume`.
    Music(f32),
    /// `set_effects_volume`.
    Effects(f32),
    /// `toggle_mute`, with the value returned.
    ToggleMute(bool),
}

/// An `AudioControl` that records every push.
#[derive(Debug, Default)]
pub struct RecordingAudioControl {
    muted: Mutex<bool>,
    calls: Mutex<Vec<AudioCall>>,
}

impl RecordingAudioControl {
    /// Creates an unmuted control.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every push received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl AudioControl for RecordingAudioControl {
    fn apply_settings(&self, settings: &AudioSettings) {
        *self.muted.lock().unwrap() = settings.is_muted;
        self.calls.lock().unwrap().push(AudioCall::Apply(*settings));
    }

    fn set_master_volume(&self, volume: f32) {
        self.calls.lock().unwrap().push(AudioCall::Master(volume));
    }

    fn set_music_volume(&self, volume: f32) {
        self.calls.lock().unwrap().push(AudioCall::Music(volume));
    }

    fn set_effects_volume(&self, volume: f32) {
        self.calls.lock().unwrap().push(AudioCall::Effects(volume));
    }

    fn toggle_mute(&self) -> bool {
        let mut muted = self.muted.lock().unwrap();
        *muted = !*muted;
        self.calls.lock().unwrap().push(AudioCall::ToggleMute(*muted));
        *muted
    }
}

/// A push received by `RecordingNarrationControl`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NarrationCall {
    /// `apply_settings`.
    Apply(NarrationSettings),
    /// `set_rate`.
    Rate(f32),
    /// `set_pitch`.
    Pitch(f32),
    /// `set_volume`.
    Volume(f32),
    /// `set_voice`.
    Voice(usize),
}

/// A `NarrationControl` that records every push.
#[derive(Debug, Default)]
pub struct RecordingNarrationControl {
    calls: Mutex<Vec<NarrationCall>>,
}

impl RecordingNarrationControl {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every push received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<NarrationCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl NarrationControl for RecordingNarrationControl {
    fn apply_settings(&self, settings: &NarrationSettings) {
        self.calls.lock().unwrap().push(NarrationCall::Apply(*settings));
    }

    fn set_rate(&self, rate: f32) {
        self.calls.lock().unwrap().push(NarrationCall::Rate(rate));
    }

    fn set_pitch(&self, pitch: f32) {
        self.calls.lock().unwrap().push(NarrationCall::Pitch(pitch));
    }

    fn set_volume(&self, volume: f32) {
        self.calls.lock().unwrap().push(NarrationCall::Volume(volume));
    }

    fn set_voice(&self, index: usize) {
        self.calls.lock().unwrap().push(NarrationCall::Voice(index));
    }
}
