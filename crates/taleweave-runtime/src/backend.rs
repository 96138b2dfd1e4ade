//! A playback backend that only logs.
//!
//! The headless player has no audio device; every handle records its
//! state and reports transitions through `tracing`.

use std::time::Duration;

use taleweave_core::error::DomainError;
use taleweave_core::playback::{AudioBackend, PlaybackHandle};
use tracing::{debug, info};

/// Creates [`LoggedHandle`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudioBackend;

impl AudioBackend for TracingAudioBackend {
    fn create(&self, uri: &str) -> Box<dyn PlaybackHandle> {
        debug!(uri, "audio handle created");
        Box::new(LoggedHandle {
            source: uri.to_owned(),
            volume: 1.0,
            muted: false,
            looping: false,
            playing: false,
            position: Duration::ZERO,
        })
    }
}

/// A handle whose playback is a log line. Once started it reports as
/// playing until paused.
#[derive(Debug)]
pub struct LoggedHandle {
    source: String,
    volume: f32,
    muted: bool,
    looping: bool,
    playing: bool,
    position: Duration,
}

impl PlaybackHandle for LoggedHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn play(&mut self) -> Result<(), DomainError> {
        self.playing = true;
        info!(
            uri = %self.source,
            volume = self.volume,
            muted = self.muted,
            looping = self.looping,
            from = ?self.position,
            "audio playing"
        );
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing {
            debug!(uri = %self.source, "audio paused");
        }
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_position(&mut self, position: Duration) {
        self.position = position;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
