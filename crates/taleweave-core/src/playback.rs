//! Audio playback capability.
//!
//! A backend creates one handle per source; handles are fire-and-forget
//! players that the audio coordinator drives tick by tick.

use std::fmt::Debug;
use std::time::Duration;

use crate::error::DomainError;

/// A single playable audio source.
pub trait PlaybackHandle: Send + Debug {
    /// The source this handle was created for.
    fn source(&self) -> &str;

    /// Starts or resumes playback.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MediaPlaybackRefused` when the platform declines
    /// to start playback (for example an autoplay policy).
    fn play(&mut self) -> Result<(), DomainError>;

    /// Pauses playback, keeping the position.
    fn pause(&mut self);

    /// Sets the output gain in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);

    /// Returns the output gain.
    fn volume(&self) -> f32;

    /// Sets the native mute flag without touching the gain.
    fn set_muted(&mut self, muted: bool);

    /// Seeks to `position`.
    fn set_position(&mut self, position: Duration);

    /// Enables or disables looping.
    fn set_looping(&mut self, looping: bool);

    /// Returns `true` while the source is audibly progressing.
    fn is_playing(&self) -> bool;
}

/// Factory for playback handles.
pub trait AudioBackend: Send + Sync {
    /// Creates a new, paused handle for `uri`.
    fn create(&self, uri: &str) -> Box<dyn PlaybackHandle>;
}
