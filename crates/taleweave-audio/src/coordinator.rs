//! The audio coordinator.
//!
//! Music changes crossfade on a spawned tick task. The coordinator keeps
//! exactly one crossfade slot; arming a new fade aborts the previous task
//! first, and every tick checks its generation against the live one so a
//! task that was already woken cannot touch a superseded fade.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use taleweave_core::control::AudioControl;
use taleweave_core::playback::{AudioBackend, PlaybackHandle};
use taleweave_core::settings::AudioSettings;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, instrument, warn};

use crate::config::AudioConfig;
use crate::effects::EffectPool;

struct Crossfade {
    generation: u64,
    incoming: Box<dyn PlaybackHandle>,
    task: Option<JoinHandle<()>>,
}

struct Mixer {
    settings: AudioSettings,
    // While a crossfade runs this is the outgoing track.
    current: Option<Box<dyn PlaybackHandle>>,
    crossfade: Option<Crossfade>,
    generation: u64,
    effects: EffectPool,
}

impl Mixer {
    fn target_track(&self) -> Option<&str> {
        self.crossfade
            .as_ref()
            .map(|fade| fade.incoming.source())
            .or_else(|| self.current.as_ref().map(|handle| handle.source()))
    }

    fn cancel_crossfade(&mut self) -> Option<Box<dyn PlaybackHandle>> {
        self.crossfade.take().map(|fade| {
            if let Some(task) = fade.task {
                task.abort();
            }
            fade.incoming
        })
    }

    /// Advances the fade owned by `generation` by one step. Returns `false`
    /// once the fade is finished or no longer live.
    fn step_crossfade(&mut self, generation: u64, step: f32) -> bool {
        let target = self.settings.music_level();
        let Some(fade) = self
            .crossfade
            .as_mut()
            .filter(|fade| fade.generation == generation)
        else {
            return false;
        };
        if let Some(outgoing) = self.current.as_mut() {
            let level = (outgoing.volume() - step).max(0.0);
            outgoing.set_volume(level);
        }
        let level = (fade.incoming.volume() + step).min(target);
        fade.incoming.set_volume(level);
        if level < target {
            return true;
        }
        self.finish_crossfade();
        false
    }

    fn finish_crossfade(&mut self) {
        let Some(fade) = self.crossfade.take() else {
            return;
        };
        debug!(uri = fade.incoming.source(), "crossfade complete");
        if let Some(mut outgoing) = self.current.replace(fade.incoming) {
            outgoing.pause();
        }
    }

    fn rescale_music(&mut self) {
        if self.crossfade.is_some() {
            // The running fade picks the new target up on its next tick.
            return;
        }
        let level = self.settings.music_level();
        if let Some(current) = self.current.as_mut() {
            current.set_volume(level);
        }
    }

    fn apply_mute(&mut self) {
        let muted = self.settings.is_muted;
        if let Some(current) = self.current.as_mut() {
            current.set_muted(muted);
        }
        if let Some(fade) = self.crossfade.as_mut() {
            fade.incoming.set_muted(muted);
        }
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.cancel_crossfade();
    }
}

/// Owner of the background music channel and the effect pool.
///
/// Crossfades run on the ambient tokio runtime. Without one, music changes
/// switch tracks immediately.
pub struct AudioCoordinator {
    mixer: Arc<Mutex<Mixer>>,
    backend: Arc<dyn AudioBackend>,
    config: AudioConfig,
}

impl AudioCoordinator {
    /// Creates a coordinator with the given starting settings.
    #[must_use]
    pub fn new(backend: Arc<dyn AudioBackend>, settings: AudioSettings, config: AudioConfig) -> Self {
        let mixer = Mixer {
            settings,
            current: None,
            crossfade: None,
            generation: 0,
            effects: EffectPool::new(config.effect_cache_uris, config.effect_handles_per_uri),
        };
        Self {
            mixer: Arc::new(Mutex::new(mixer)),
            backend,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Crossfades to `uri`. Does nothing if `uri` is already the current
    /// track or the target of the running crossfade.
    ///
    /// Returns before the fade completes.
    #[instrument(skip(self))]
    pub fn play_background_music(&self, uri: &str) {
        let mut mixer = self.lock();
        if mixer.target_track() == Some(uri) {
            debug!("track already playing");
            return;
        }

        if let Some(partial) = mixer.cancel_crossfade() {
            debug!(uri = partial.source(), "superseding running crossfade");
            if let Some(mut stale) = mixer.current.replace(partial) {
                stale.pause();
            }
        }

        let mut incoming = self.backend.create(uri);
        incoming.set_looping(true);
        incoming.set_muted(mixer.settings.is_muted);
        incoming.set_volume(0.0);
        if let Err(err) = incoming.play() {
            warn!(error = %err, "background music refused to start");
        }

        mixer.generation += 1;
        let generation = mixer.generation;
        mixer.crossfade = Some(Crossfade {
            generation,
            incoming,
            task: None,
        });

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(run_crossfade(
                    Arc::downgrade(&self.mixer),
                    generation,
                    self.config,
                ));
                if let Some(fade) = mixer.crossfade.as_mut() {
                    fade.task = Some(task);
                }
            }
            Err(_) => {
                debug!("no async runtime; switching tracks without a fade");
                let level = mixer.settings.music_level();
                if let Some(fade) = mixer.crossfade.as_mut() {
                    fade.incoming.set_volume(level);
                }
                mixer.finish_crossfade();
            }
        }
    }

    /// Plays `uri` once at `relative_volume` scaled by the effects and
    /// master volumes. Suppressed while muted.
    #[instrument(skip(self))]
    pub fn play_sound_effect(&self, uri: &str, relative_volume: f32) {
        let mut mixer = self.lock();
        if mixer.settings.is_muted {
            debug!("muted; effect suppressed");
            return;
        }
        let volume = mixer.settings.effect_level(relative_volume);
        if let Err(err) = mixer.effects.trigger(self.backend.as_ref(), uri, volume) {
            warn!(error = %err, "sound effect refused to start");
        }
    }

    /// Sets the master volume and rescales the playing music.
    pub fn set_master_volume(&self, volume: f32) {
        let mut mixer = self.lock();
        mixer.settings.master_volume = volume;
        mixer.rescale_music();
    }

    /// Sets the music volume and rescales the playing music.
    pub fn set_music_volume(&self, volume: f32) {
        let mut mixer = self.lock();
        mixer.settings.music_volume = volume;
        mixer.rescale_music();
    }

    /// Sets the effects volume. Effects already playing keep their level.
    pub fn set_effects_volume(&self, volume: f32) {
        self.lock().settings.effects_volume = volume;
    }

    /// Flips the mute flag and returns the new value. Music handles are
    /// muted natively so their volume survives.
    pub fn toggle_mute(&self) -> bool {
        let mut mixer = self.lock();
        mixer.settings.is_muted = !mixer.settings.is_muted;
        mixer.apply_mute();
        debug!(muted = mixer.settings.is_muted, "mute toggled");
        mixer.settings.is_muted
    }

    /// Replaces the cached settings.
    pub fn apply_settings(&self, settings: &AudioSettings) {
        let mut mixer = self.lock();
        mixer.settings = *settings;
        mixer.apply_mute();
        mixer.rescale_music();
    }

    /// Stops music and every effect and forgets the current track.
    pub fn stop_all(&self) {
        let mut mixer = self.lock();
        if let Some(mut incoming) = mixer.cancel_crossfade() {
            incoming.pause();
        }
        if let Some(mut current) = mixer.current.take() {
            current.pause();
        }
        mixer.effects.pause_all();
        debug!("all audio stopped");
    }

    /// Stops everything and releases every handle. No timer outlives this
    /// call.
    pub fn shutdown(&self) {
        self.stop_all();
        self.lock().effects.clear();
    }

    /// The track music is playing or fading towards.
    #[must_use]
    pub fn current_track(&self) -> Option<String> {
        self.lock().target_track().map(str::to_owned)
    }

    /// Whether a crossfade is in progress.
    #[must_use]
    pub fn is_crossfading(&self) -> bool {
        self.lock().crossfade.is_some()
    }

    /// The cached settings.
    #[must_use]
    pub fn settings(&self) -> AudioSettings {
        self.lock().settings
    }
}

async fn run_crossfade(mixer: Weak<Mutex<Mixer>>, generation: u64, config: AudioConfig) {
    let mut ticker = interval_at(Instant::now() + config.fade_tick, config.fade_tick);
    loop {
        ticker.tick().await;
        let Some(shared) = mixer.upgrade() else {
            return;
        };
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.step_crossfade(generation, config.fade_step) {
            return;
        }
    }
}

impl AudioControl for AudioCoordinator {
    fn apply_settings(&self, settings: &AudioSettings) {
        Self::apply_settings(self, settings);
    }

    fn set_master_volume(&self, volume: f32) {
        Self::set_master_volume(self, volume);
    }

    fn set_music_volume(&self, volume: f32) {
        Self::set_music_volume(self, volume);
    }

    fn set_effects_volume(&self, volume: f32) {
        Self::set_effects_volume(self, volume);
    }

    fn toggle_mute(&self) -> bool {
        Self::toggle_mute(self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use taleweave_test_support::{HandleRecord, RecordingAudioBackend};
    use tokio::time::sleep;

    use super::*;

    const MUSIC_LEVEL: f32 = 0.15;

    fn coordinator() -> (AudioCoordinator, Arc<RecordingAudioBackend>) {
        let backend = Arc::new(RecordingAudioBackend::new());
        let coordinator = AudioCoordinator::new(
            backend.clone(),
            AudioSettings::default(),
            AudioConfig::default(),
        );
        (coordinator, backend)
    }

    fn track_handle(backend: &RecordingAudioBackend, uri: &str) -> HandleRecord {
        backend.handles_for(uri).remove(0)
    }

    fn approx(actual: f32, expected: f32) -> bool {
        (actual - expected).abs() < 1e-5
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_track_fades_in_to_music_level() {
        // Arrange
        let (audio, backend) = coordinator();

        // Act
        audio.play_background_music("/music/forest.mp3");
        let started_at = track_handle(&backend, "/music/forest.mp3").volume();
        sleep(Duration::from_millis(150)).await;
        let after_one_tick = track_handle(&backend, "/music/forest.mp3").volume();
        sleep(Duration::from_secs(1)).await;

        // Assert
        let forest = track_handle(&backend, "/music/forest.mp3");
        assert!(approx(started_at, 0.0));
        assert!(approx(after_one_tick, 0.05));
        assert!(approx(forest.volume(), MUSIC_LEVEL));
        assert!(forest.is_playing());
        assert!(forest.is_looping());
        assert!(!audio.is_crossfading());
        assert_eq!(audio.current_track().as_deref(), Some("/music/forest.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_crossfade_stops_outgoing_track() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/forest.mp3");
        sleep(Duration::from_secs(1)).await;

        // Act
        audio.play_background_music("/music/cave.mp3");
        sleep(Duration::from_millis(150)).await;
        let forest_mid_fade = track_handle(&backend, "/music/forest.mp3").volume();
        sleep(Duration::from_secs(1)).await;

        // Assert
        assert!(approx(forest_mid_fade, 0.10));
        assert!(!track_handle(&backend, "/music/forest.mp3").is_playing());
        let cave = track_handle(&backend, "/music/cave.mp3");
        assert!(cave.is_playing());
        assert!(approx(cave.volume(), MUSIC_LEVEL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_track_is_a_noop() {
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/forest.mp3");
        sleep(Duration::from_millis(150)).await;

        audio.play_background_music("/music/forest.mp3");
        sleep(Duration::from_secs(1)).await;
        audio.play_background_music("/music/forest.mp3");

        assert_eq!(backend.handles().len(), 1);
        assert_eq!(track_handle(&backend, "/music/forest.mp3").play_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseding_crossfade_leaves_only_latest_track() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_millis(150)).await;

        // Act
        audio.play_background_music("/music/b.mp3");
        // The aborted fade would have ticked at 200 ms.
        sleep(Duration::from_millis(60)).await;
        let a_after_abort = track_handle(&backend, "/music/a.mp3").volume();
        let mut both_at_full = false;
        for _ in 0..20 {
            sleep(Duration::from_millis(100)).await;
            let a = track_handle(&backend, "/music/a.mp3");
            let b = track_handle(&backend, "/music/b.mp3");
            both_at_full |= a.is_playing()
                && b.is_playing()
                && approx(a.volume(), MUSIC_LEVEL)
                && approx(b.volume(), MUSIC_LEVEL);
        }

        // Assert
        assert!(approx(a_after_abort, 0.05));
        assert!(!both_at_full);
        assert!(!track_handle(&backend, "/music/a.mp3").is_playing());
        let b = track_handle(&backend, "/music/b.mp3");
        assert!(b.is_playing());
        assert!(approx(b.volume(), MUSIC_LEVEL));
        assert!(!audio.is_crossfading());
        assert_eq!(audio.current_track().as_deref(), Some("/music/b.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseding_crossfade_stops_original_outgoing_track() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_secs(1)).await;
        audio.play_background_music("/music/b.mp3");
        sleep(Duration::from_millis(150)).await;

        // Act
        audio.play_background_music("/music/c.mp3");

        // Assert
        let playing: Vec<String> = backend
            .handles()
            .iter()
            .filter(|h| h.is_playing())
            .map(|h| h.source().to_owned())
            .collect();
        assert_eq!(playing, vec!["/music/b.mp3", "/music/c.mp3"]);
        assert_eq!(track_handle(&backend, "/music/a.mp3").pause_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_playback_still_advances_current_track() {
        // Arrange
        let backend = Arc::new(RecordingAudioBackend::refusing());
        let audio = AudioCoordinator::new(
            backend.clone(),
            AudioSettings::default(),
            AudioConfig::default(),
        );

        // Act
        audio.play_background_music("/music/a.mp3");
        audio.play_sound_effect("/sounds/select.mp3", 1.0);
        sleep(Duration::from_secs(1)).await;

        // Assert
        assert_eq!(audio.current_track().as_deref(), Some("/music/a.mp3"));
        assert!(!audio.is_crossfading());
        assert_eq!(backend.handles_for("/sounds/select.mp3").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_changes_rescale_current_music() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_secs(1)).await;

        // Act
        audio.set_master_volume(1.0);
        let after_master = track_handle(&backend, "/music/a.mp3").volume();
        audio.set_music_volume(0.5);

        // Assert
        assert!(approx(after_master, 0.3));
        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), 0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_change_mid_fade_retargets_fade() {
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_millis(150)).await;

        audio.set_music_volume(0.1);
        sleep(Duration::from_secs(1)).await;

        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), 0.05));
        assert!(!audio.is_crossfading());
    }

    #[test]
    fn test_effect_volume_scales_by_effects_and_master() {
        // Arrange
        let (audio, backend) = coordinator();

        // Act
        audio.play_sound_effect("/sounds/select.mp3", 1.0);
        audio.set_effects_volume(0.2);
        audio.play_sound_effect("/sounds/door.mp3", 0.3);

        // Assert
        assert!(approx(track_handle(&backend, "/sounds/select.mp3").volume(), 0.35));
        assert!(approx(track_handle(&backend, "/sounds/door.mp3").volume(), 0.03));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mute_sets_native_flag_and_suppresses_effects() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_secs(1)).await;

        // Act
        let muted = audio.toggle_mute();
        audio.play_sound_effect("/sounds/select.mp3", 1.0);
        audio.play_background_music("/music/b.mp3");

        // Assert
        assert!(muted);
        let a = track_handle(&backend, "/music/a.mp3");
        assert!(a.is_muted());
        assert!(approx(a.volume(), MUSIC_LEVEL));
        assert!(track_handle(&backend, "/music/b.mp3").is_muted());
        assert!(backend.handles_for("/sounds/select.mp3").is_empty());
        assert!(!audio.toggle_mute());
        assert!(!track_handle(&backend, "/music/b.mp3").is_muted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_settings_reconciles_live_music() {
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        sleep(Duration::from_secs(1)).await;

        audio.apply_settings(&AudioSettings {
            is_muted: true,
            master_volume: 1.0,
            music_volume: 1.0,
            effects_volume: 1.0,
        });

        let a = track_handle(&backend, "/music/a.mp3");
        assert!(a.is_muted());
        assert!(approx(a.volume(), 1.0));
        assert!(audio.settings().is_muted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_pauses_everything_and_cancels_fade() {
        // Arrange
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");
        audio.play_sound_effect("/sounds/wind.mp3", 0.3);
        sleep(Duration::from_millis(150)).await;

        // Act
        audio.stop_all();
        sleep(Duration::from_secs(1)).await;

        // Assert
        assert!(backend.handles().iter().all(|h| !h.is_playing()));
        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), 0.05));
        assert_eq!(audio.current_track(), None);
        assert!(!audio.is_crossfading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_clears_timer_before_dangling_tick() {
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");

        audio.shutdown();
        sleep(Duration::from_secs(1)).await;

        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), 0.0));
    }

    #[test]
    fn test_music_switches_immediately_without_runtime() {
        let (audio, backend) = coordinator();

        audio.play_background_music("/music/a.mp3");

        assert!(!audio.is_crossfading());
        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), MUSIC_LEVEL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_coordinator_ends_fade_task() {
        let (audio, backend) = coordinator();
        audio.play_background_music("/music/a.mp3");

        drop(audio);
        sleep(Duration::from_secs(1)).await;

        assert!(approx(track_handle(&backend, "/music/a.mp3").volume(), 0.0));
    }
}
