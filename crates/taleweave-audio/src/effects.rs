//! Sound effect handle pool.
//!
//! Handles are grouped by source. A finished handle is rewound and reused;
//! an overlapping request for a source that is still playing gets a fresh
//! handle, up to the per-source cap. Sources are evicted least recently
//! used first.

use std::collections::VecDeque;
use std::time::Duration;

use taleweave_core::error::DomainError;
use taleweave_core::playback::{AudioBackend, PlaybackHandle};
use tracing::debug;

pub(crate) struct EffectPool {
    // Front is least recently used.
    slots: VecDeque<(String, Vec<Box<dyn PlaybackHandle>>)>,
    max_sources: usize,
    max_handles: usize,
}

impl EffectPool {
    pub(crate) fn new(max_sources: usize, max_handles: usize) -> Self {
        Self {
            slots: VecDeque::new(),
            max_sources: max_sources.max(1),
            max_handles: max_handles.max(1),
        }
    }

    /// Plays `uri` at `volume` from the start on a pooled handle.
    pub(crate) fn trigger(
        &mut self,
        backend: &dyn AudioBackend,
        uri: &str,
        volume: f32,
    ) -> Result<(), DomainError> {
        let mut handles = self
            .slots
            .iter()
            .position(|(source, _)| source == uri)
            .and_then(|index| self.slots.remove(index))
            .map(|(_, handles)| handles)
            .unwrap_or_default();

        if self.slots.len() >= self.max_sources {
            if let Some((evicted, mut stale)) = self.slots.pop_front() {
                debug!(uri = %evicted, "evicting effect handles");
                stale.iter_mut().for_each(|handle| handle.pause());
            }
        }

        let index = match handles.iter().position(|handle| !handle.is_playing()) {
            Some(index) => index,
            None if handles.len() < self.max_handles => {
                handles.push(backend.create(uri));
                handles.len() - 1
            }
            None => {
                // Every handle is busy: restart the one that started first.
                handles.rotate_left(1);
                handles.len() - 1
            }
        };

        let handle = &mut handles[index];
        handle.set_volume(volume);
        handle.set_position(Duration::ZERO);
        let result = handle.play();
        self.slots.push_back((uri.to_owned(), handles));
        result
    }

    /// Pauses every pooled handle.
    pub(crate) fn pause_all(&mut self) {
        self.slots
            .iter_mut()
            .flat_map(|(_, handles)| handles.iter_mut())
            .for_each(|handle| handle.pause());
    }

    /// Drops every pooled handle.
    pub(crate) fn clear(&mut self) {
        self.pause_all();
        self.slots.clear();
    }

    #[cfg(test)]
    pub(crate) fn sources(&self) -> Vec<&str> {
        self.slots.iter().map(|(source, _)| source.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taleweave_test_support::RecordingAudioBackend;

    #[test]
    fn test_finished_handle_is_rewound_and_reused() {
        // Arrange
        let backend = RecordingAudioBackend::new();
        let mut pool = EffectPool::new(4, 4);
        pool.trigger(&backend, "door.mp3", 0.5).unwrap();
        backend.handles()[0].finish();

        // Act
        pool.trigger(&backend, "door.mp3", 0.25).unwrap();

        // Assert
        let handles = backend.handles_for("door.mp3");
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].play_calls(), 2);
        assert_eq!(handles[0].position(), Duration::ZERO);
        assert_eq!(handles[0].volume(), 0.25);
    }

    #[test]
    fn test_overlapping_requests_get_fresh_handles() {
        let backend = RecordingAudioBackend::new();
        let mut pool = EffectPool::new(4, 4);

        pool.trigger(&backend, "step.mp3", 1.0).unwrap();
        pool.trigger(&backend, "step.mp3", 1.0).unwrap();

        let handles = backend.handles_for("step.mp3");
        assert_eq!(handles.len(), 2);
        assert!(handles.iter().all(|h| h.is_playing() && h.play_calls() == 1));
    }

    #[test]
    fn test_busy_source_at_cap_restarts_oldest_handle() {
        // Arrange
        let backend = RecordingAudioBackend::new();
        let mut pool = EffectPool::new(4, 2);

        // Act
        for _ in 0..3 {
            pool.trigger(&backend, "bell.mp3", 1.0).unwrap();
        }

        // Assert
        let handles = backend.handles_for("bell.mp3");
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].play_calls(), 2);
        assert_eq!(handles[1].play_calls(), 1);
    }

    #[test]
    fn test_least_recently_used_source_is_evicted() {
        // Arrange
        let backend = RecordingAudioBackend::new();
        let mut pool = EffectPool::new(2, 4);
        pool.trigger(&backend, "a.mp3", 1.0).unwrap();
        pool.trigger(&backend, "b.mp3", 1.0).unwrap();
        pool.trigger(&backend, "a.mp3", 1.0).unwrap();

        // Act
        pool.trigger(&backend, "c.mp3", 1.0).unwrap();

        // Assert
        assert_eq!(pool.sources(), vec!["a.mp3", "c.mp3"]);
        assert!(!backend.handles_for("b.mp3")[0].is_playing());
    }

    #[test]
    fn test_refused_playback_is_reported_and_handle_kept() {
        let backend = RecordingAudioBackend::refusing();
        let mut pool = EffectPool::new(4, 4);

        let result = pool.trigger(&backend, "door.mp3", 1.0);

        assert!(matches!(
            result,
            Err(DomainError::MediaPlaybackRefused { .. })
        ));
        assert_eq!(pool.sources(), vec!["door.mp3"]);
    }
}
