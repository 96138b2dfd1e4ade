//! Test audio backend — records every handle it creates so tests can
//! inspect volumes and play state after the coordinator owns the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taleweave_core::error::DomainError;
use taleweave_core::playback::{AudioBackend, PlaybackHandle};

#[derive(Debug, Default)]
struct HandleState {
    volume: f32,
    muted: bool,
    playing: bool,
    looping: bool,
    position: Duration,
    play_calls: usize,
    pause_calls: usize,
}

/// Read-only view of a handle created by `RecordingAudioBackend`.
#[derive(Debug, Clone)]
pub struct HandleRecord {
    source: String,
    state: Arc<Mutex<HandleState>>,
}

impl HandleRecord {
    /// The source the handle was created for.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current gain.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    /// Current native mute flag.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    /// Whether the handle is playing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    /// Whether looping is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    /// Last position set.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    /// Number of `play` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    /// Number of `pause` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    /// Simulates the source reaching its end.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn finish(&self) {
        self.state.lock().unwrap().playing = false;
    }
}

#[derive(Debug)]
struct MockHandle {
    source: String,
    refuse: bool,
    state: Arc<Mutex<HandleState>>,
}

impl PlaybackHandle for MockHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn play(&mut self) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        if self.refuse {
            return Err(DomainError::MediaPlaybackRefused {
                uri: self.source.clone(),
                reason: "autoplay blocked".into(),
            });
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.pause_calls += 1;
        state.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn set_position(&mut self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

/// An audio backend whose handles record their state. Optionally refuses
/// every `play` call, like a browser enforcing an autoplay policy.
#[derive(Debug, Default)]
pub struct RecordingAudioBackend {
    handles: Mutex<Vec<HandleRecord>>,
    refuse_playback: AtomicBool,
}

impl RecordingAudioBackend {
    /// Creates a backend that accepts playback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose handles refuse to play.
    #[must_use]
    pub fn refusing() -> Self {
        let backend = Self::default();
        backend.refuse_playback.store(true, Ordering::SeqCst);
        backend
    }

    /// All handles created so far, in creation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handles(&self) -> Vec<HandleRecord> {
        self.handles.lock().unwrap().clone()
    }

    /// Handles created for `uri`, in creation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handles_for(&self, uri: &str) -> Vec<HandleRecord> {
        self.handles
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.source == uri)
            .cloned()
            .collect()
    }
}

impl AudioBackend for RecordingAudioBackend {
    fn create(&self, uri: &str) -> Box<dyn PlaybackHandle> {
        let state = Arc::new(Mutex::new(HandleState::default()));
        self.handles.lock().unwrap().push(HandleRecord {
            source: uri.to_owned(),
            state: Arc::clone(&state),
        });
        Box::new(MockHandle {
            source: uri.to_owned(),
            refuse: self.refuse_playback.load(Ordering::SeqCst),
            state,
        })
    }
}
