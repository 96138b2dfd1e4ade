//! The narration coordinator.
//!
//! Sessions move `Idle -> Starting -> Speaking <-> Paused -> Idle`. Engine
//! events arrive on a channel drained by a pump task and are matched to
//! the live session by utterance id, so late events from a cancelled
//! utterance are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use taleweave_core::control::NarrationControl;
use taleweave_core::node::NodeId;
use taleweave_core::settings::NarrationSettings;
use taleweave_core::speech::{
    EngineEvent, SpeechEngine, Utterance, UtteranceUpdate, Voice, default_voice,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::NarrationConfig;
use crate::events::{NarrationEvent, NarrationState};

enum Phase {
    // Waiting out the start delay; not yet handed to the engine.
    Pending(Option<JoinHandle<()>>),
    // Handed to the engine; waiting for it to confirm.
    Starting,
    Speaking,
    Paused,
}

struct Session {
    id: Uuid,
    text: String,
    node: Option<NodeId>,
    phase: Phase,
}

impl Session {
    fn engine_has_utterance(&self) -> bool {
        !matches!(self.phase, Phase::Pending(_))
    }
}

struct Narrator {
    settings: NarrationSettings,
    voices: Vec<Voice>,
    session: Option<Session>,
    events: broadcast::Sender<NarrationEvent>,
}

impl Narrator {
    fn emit(&self, event: NarrationEvent) {
        debug!(?event, "narration event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn selected_voice(&self) -> Option<&Voice> {
        self.settings
            .voice_index
            .and_then(|index| self.voices.get(index))
            .or_else(|| default_voice(&self.voices))
    }

    fn state(&self) -> NarrationState {
        match self.session.as_ref().map(|session| &session.phase) {
            None => NarrationState::Idle,
            Some(Phase::Pending(_) | Phase::Starting) => NarrationState::Starting,
            Some(Phase::Speaking) => NarrationState::Speaking,
            Some(Phase::Paused) => NarrationState::Paused,
        }
    }

    fn stop(&mut self, engine: Option<&dyn SpeechEngine>) {
        let Some(session) = self.session.take() else {
            return;
        };
        let handed_over = session.engine_has_utterance();
        if let Phase::Pending(Some(task)) = session.phase {
            task.abort();
        }
        if handed_over {
            if let Some(engine) = engine {
                engine.cancel();
            }
        }
        self.emit(NarrationEvent::Stopped(session.id));
    }

    /// Builds the utterance for the pending session `id`, marking it handed
    /// over. Returns `None` if `id` was superseded.
    fn take_pending(&mut self, id: Uuid) -> Option<Utterance> {
        let voice = self.selected_voice().cloned();
        let settings = self.settings;
        let session = self
            .session
            .as_mut()
            .filter(|session| session.id == id && !session.engine_has_utterance())?;
        session.phase = Phase::Starting;
        Some(Utterance {
            id,
            text: session.text.clone(),
            voice,
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
        })
    }

    fn launch(&mut self, engine: &dyn SpeechEngine, id: Uuid) {
        let Some(utterance) = self.take_pending(id) else {
            debug!(session = %id, "pending narration was superseded");
            return;
        };
        if let Err(err) = engine.speak(utterance) {
            warn!(session = %id, error = %err, "speech engine refused utterance");
            self.session = None;
            self.emit(NarrationEvent::Finished(id));
        }
    }

    fn update_live(&self, engine: Option<&dyn SpeechEngine>, update: UtteranceUpdate) {
        let (Some(engine), Some(session)) = (engine, self.session.as_ref()) else {
            return;
        };
        if matches!(session.phase, Phase::Speaking | Phase::Paused)
            && !engine.update(session.id, update)
        {
            debug!(?update, "engine cannot update utterance in flight; applies to the next one");
        }
    }

    fn on_engine_event(&mut self, engine: &dyn SpeechEngine, event: EngineEvent) {
        let live = self.session.as_ref().map(|session| session.id);
        match event {
            EngineEvent::Started(id) if live == Some(id) => {
                if let Some(session) = self.session.as_mut() {
                    if matches!(session.phase, Phase::Starting) {
                        session.phase = Phase::Speaking;
                        self.emit(NarrationEvent::Started(id));
                    }
                }
            }
            EngineEvent::Ended(id) if live == Some(id) => {
                self.session = None;
                self.emit(NarrationEvent::Finished(id));
            }
            EngineEvent::Failed { utterance, detail } if live == Some(utterance) => {
                warn!(session = %utterance, detail = %detail, "speech engine error; ending narration");
                self.session = None;
                self.emit(NarrationEvent::Finished(utterance));
            }
            EngineEvent::VoicesChanged => {
                self.voices = engine.voices();
                info!(
                    voices = self.voices.len(),
                    selected = self.selected_voice().map_or("-", |voice| voice.name.as_str()),
                    "voice list updated"
                );
            }
            stale => debug!(event = ?stale, "ignoring event for superseded utterance"),
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        if let Some(Session {
            phase: Phase::Pending(Some(task)),
            ..
        }) = self.session.as_ref()
        {
            task.abort();
        }
    }
}

/// Owner of the single narration session.
///
/// Without an engine every operation is a no-op, except that `speak`
/// publishes `Finished` immediately.
pub struct NarrationCoordinator {
    narrator: Arc<Mutex<Narrator>>,
    engine: Option<Arc<dyn SpeechEngine>>,
    events: broadcast::Sender<NarrationEvent>,
    pump: Option<JoinHandle<()>>,
    config: NarrationConfig,
}

impl NarrationCoordinator {
    /// Creates the coordinator and starts draining engine events. Call
    /// from within a tokio runtime; outside one, engine events are not
    /// processed and speech starts without the delay.
    #[must_use]
    pub fn new(engine: Option<Arc<dyn SpeechEngine>>, config: NarrationConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let voices = engine.as_ref().map(|engine| engine.voices()).unwrap_or_default();
        let narrator = Arc::new(Mutex::new(Narrator {
            settings: NarrationSettings::default(),
            voices,
            session: None,
            events: events.clone(),
        }));

        let pump = engine.as_ref().and_then(|engine| {
            let (sink, receiver) = mpsc::unbounded_channel();
            engine.attach(sink);
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => Some(runtime.spawn(pump_engine_events(
                    Arc::downgrade(&narrator),
                    Arc::clone(engine),
                    receiver,
                ))),
                Err(_) => {
                    warn!("no async runtime; speech engine events will not be processed");
                    None
                }
            }
        });

        info!(supported = engine.is_some(), "narration ready");
        Self {
            narrator,
            engine,
            events,
            pump,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Narrator> {
        self.narrator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to status events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.events.subscribe()
    }

    /// Whether a speech engine is available.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    /// Stops whatever is active and starts a new session for `text`.
    /// Returns the new session id; `Started` follows once the engine
    /// confirms.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub fn speak(&self, text: &str, node: Option<&str>) -> Uuid {
        let mut narrator = self.lock();
        self.speak_locked(&mut narrator, text.to_owned(), node.map(str::to_owned))
    }

    fn speak_locked(&self, narrator: &mut Narrator, text: String, node: Option<NodeId>) -> Uuid {
        narrator.stop(self.engine.as_deref());
        let id = Uuid::new_v4();
        let Some(engine) = self.engine.as_ref() else {
            narrator.emit(NarrationEvent::Finished(id));
            return id;
        };
        if text.trim().is_empty() {
            debug!("nothing to narrate");
            narrator.emit(NarrationEvent::Finished(id));
            return id;
        }

        narrator.session = Some(Session {
            id,
            text,
            node,
            phase: Phase::Pending(None),
        });
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(start_after_delay(
                    Arc::downgrade(&self.narrator),
                    Arc::clone(engine),
                    id,
                    self.config,
                ));
                if let Some(session) = narrator.session.as_mut() {
                    session.phase = Phase::Pending(Some(task));
                }
            }
            Err(_) => narrator.launch(engine.as_ref(), id),
        }
        id
    }

    /// Stops the active session. Safe to call when idle.
    pub fn stop(&self) {
        self.lock().stop(self.engine.as_deref());
    }

    /// Pauses a speaking session.
    pub fn pause(&self) {
        let mut narrator = self.lock();
        let Some(session) = narrator.session.as_mut() else {
            return;
        };
        if !matches!(session.phase, Phase::Speaking) {
            return;
        }
        session.phase = Phase::Paused;
        let id = session.id;
        if let Some(engine) = self.engine.as_ref() {
            engine.pause();
        }
        narrator.emit(NarrationEvent::Paused(id));
    }

    /// Resumes a paused session.
    pub fn resume(&self) {
        let mut narrator = self.lock();
        let Some(session) = narrator.session.as_mut() else {
            return;
        };
        if !matches!(session.phase, Phase::Paused) {
            return;
        }
        session.phase = Phase::Speaking;
        let id = session.id;
        if let Some(engine) = self.engine.as_ref() {
            engine.resume();
        }
        narrator.emit(NarrationEvent::Resumed(id));
    }

    /// Sets the speech rate, patching the utterance in flight.
    pub fn set_rate(&self, rate: f32) {
        let mut narrator = self.lock();
        narrator.settings.rate = rate;
        narrator.update_live(self.engine.as_deref(), UtteranceUpdate::Rate(rate));
    }

    /// Sets the speech pitch, patching the utterance in flight.
    pub fn set_pitch(&self, pitch: f32) {
        let mut narrator = self.lock();
        narrator.settings.pitch = pitch;
        narrator.update_live(self.engine.as_deref(), UtteranceUpdate::Pitch(pitch));
    }

    /// Sets the speech volume, patching the utterance in flight.
    pub fn set_volume(&self, volume: f32) {
        let mut narrator = self.lock();
        narrator.settings.volume = volume;
        narrator.update_live(self.engine.as_deref(), UtteranceUpdate::Volume(volume));
    }

    /// Selects a voice. A session the engine already has is restarted
    /// with the same text and node so the new voice is heard.
    pub fn set_voice(&self, index: usize) {
        let mut narrator = self.lock();
        narrator.settings.voice_index = Some(index);
        let restart = narrator
            .session
            .as_ref()
            .filter(|session| session.engine_has_utterance())
            .map(|session| (session.text.clone(), session.node.clone()));
        if let Some((text, node)) = restart {
            debug!(voice_index = index, "restarting narration with new voice");
            self.speak_locked(&mut narrator, text, node);
        }
    }

    /// Replaces the cached preferences, including the chosen voice.
    /// Disabling narration stops the active session.
    pub fn apply_settings(&self, settings: &NarrationSettings) {
        let mut narrator = self.lock();
        narrator.settings = *settings;
        if !settings.enabled {
            narrator.stop(self.engine.as_deref());
        }
    }

    /// Stops narration and the engine event pump.
    pub fn shutdown(&self) {
        self.stop();
        if let Some(pump) = self.pump.as_ref() {
            pump.abort();
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> NarrationState {
        self.lock().state()
    }

    /// The live session id, if any.
    #[must_use]
    pub fn session(&self) -> Option<Uuid> {
        self.lock().session.as_ref().map(|session| session.id)
    }

    /// Text of the live session.
    #[must_use]
    pub fn current_text(&self) -> Option<String> {
        self.lock().session.as_ref().map(|session| session.text.clone())
    }

    /// Node of the live session.
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.lock().session.as_ref().and_then(|session| session.node.clone())
    }

    /// Voices known to the engine.
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.lock().voices.clone()
    }

    /// The voice the next utterance will use: the voice picked with
    /// `set_voice` while its index is valid, else the default voice.
    #[must_use]
    pub fn selected_voice(&self) -> Option<Voice> {
        self.lock().selected_voice().cloned()
    }

    /// The cached preferences.
    #[must_use]
    pub fn settings(&self) -> NarrationSettings {
        self.lock().settings
    }
}

impl Drop for NarrationCoordinator {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn start_after_delay(
    narrator: Weak<Mutex<Narrator>>,
    engine: Arc<dyn SpeechEngine>,
    id: Uuid,
    config: NarrationConfig,
) {
    tokio::time::sleep(config.start_delay).await;
    let Some(shared) = narrator.upgrade() else {
        return;
    };
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    guard.launch(engine.as_ref(), id);
}

async fn pump_engine_events(
    narrator: Weak<Mutex<Narrator>>,
    engine: Arc<dyn SpeechEngine>,
    mut receiver: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = receiver.recv().await {
        let Some(shared) = narrator.upgrade() else {
            return;
        };
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        guard.on_engine_event(engine.as_ref(), event);
    }
}

impl NarrationControl for NarrationCoordinator {
    fn apply_settings(&self, settings: &NarrationSettings) {
        Self::apply_settings(self, settings);
    }

    fn set_rate(&self, rate: f32) {
        Self::set_rate(self, rate);
    }

    fn set_pitch(&self, pitch: f32) {
        Self::set_pitch(self, pitch);
    }

    fn set_volume(&self, volume: f32) {
        Self::set_volume(self, volume);
    }

    fn set_voice(&self, index: usize) {
        Self::set_voice(self, index);
    }
}
