//! The story runtime.
//!
//! Composes the narrative state machine with the audio and narration
//! coordinators. Node transitions drive the media: music crossfades,
//! ambient and entry effects, optional auto-narration and UI sound cues.

use std::sync::Arc;

use taleweave_audio::AudioCoordinator;
use taleweave_core::clock::Clock;
use taleweave_core::error::DomainError;
use taleweave_core::node::{NodeId, StoryNode};
use taleweave_core::playback::AudioBackend;
use taleweave_core::settings::AudioSettings;
use taleweave_core::source::NodeSource;
use taleweave_core::speech::SpeechEngine;
use taleweave_core::store::KeyValueStore;
use taleweave_narration::{NarrationCoordinator, NarrationEvent, NarrationState};
use taleweave_narrative::application::query_handlers::{self, ChoiceView};
use taleweave_narrative::application::state_machine::NarrativeStateMachine;
use taleweave_narrative::domain::actions::{Action, Dispatched};
use taleweave_narrative::domain::state::GameState;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::{RuntimeConfig, SoundCues};

/// Message recorded in `GameState::error` when a node cannot be fetched.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load story node. Please try again.";

/// Relative volume of a node's ambient sound.
pub const AMBIENT_RELATIVE_VOLUME: f32 = 0.3;

/// External collaborators the runtime is composed from.
pub struct Collaborators {
    /// Where story nodes come from.
    pub source: Arc<dyn NodeSource>,
    /// Where the game is saved.
    pub store: Arc<dyn KeyValueStore>,
    /// Timestamps for saved games.
    pub clock: Arc<dyn Clock>,
    /// Audio output.
    pub audio_backend: Arc<dyn AudioBackend>,
    /// Text-to-speech, when the platform has one.
    pub speech: Option<Arc<dyn SpeechEngine>>,
}

/// Player-facing entry point.
pub struct StoryRuntime {
    machine: NarrativeStateMachine,
    source: Arc<dyn NodeSource>,
    audio: Arc<AudioCoordinator>,
    narration: Arc<NarrationCoordinator>,
    cues: SoundCues,
    start_node: NodeId,
}

impl StoryRuntime {
    /// Builds the coordinators and restores the saved game. Call from
    /// within a tokio runtime.
    pub async fn new(collaborators: Collaborators, config: &RuntimeConfig) -> Self {
        let Collaborators {
            source,
            store,
            clock,
            audio_backend,
            speech,
        } = collaborators;
        let audio = Arc::new(AudioCoordinator::new(
            audio_backend,
            AudioSettings::default(),
            config.audio,
        ));
        let narration = Arc::new(NarrationCoordinator::new(speech, config.narration));
        let machine =
            NarrativeStateMachine::new(store, clock, audio.clone(), narration.clone()).await;
        Self {
            machine,
            source,
            audio,
            narration,
            cues: config.cues.clone(),
            start_node: config.start_node.clone(),
        }
    }

    /// The current game state.
    #[must_use]
    pub fn snapshot(&self) -> &GameState {
        self.machine.snapshot()
    }

    /// The current node's choices with their availability.
    #[must_use]
    pub fn available_choices(&self) -> Vec<ChoiceView> {
        query_handlers::available_choices(&self.machine)
    }

    /// Whether there is a saved game to continue.
    #[must_use]
    pub fn has_saved_game(&self) -> bool {
        !self.snapshot().history.is_empty()
    }

    /// The audio coordinator.
    #[must_use]
    pub fn audio(&self) -> &AudioCoordinator {
        &self.audio
    }

    /// The narration coordinator.
    #[must_use]
    pub fn narration(&self) -> &NarrationCoordinator {
        &self.narration
    }

    /// Subscribes to narration status events.
    #[must_use]
    pub fn subscribe_narration(&self) -> broadcast::Receiver<NarrationEvent> {
        self.narration.subscribe()
    }

    /// Loads `node_id` and enters it. Loading the node that is already
    /// current does nothing.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after recording `LOAD_FAILED_MESSAGE` in the
    /// state; the previous node stays current.
    #[instrument(skip(self))]
    pub async fn go_to(&mut self, node_id: &str) -> Result<(), DomainError> {
        if self.snapshot().current_node_id() == Some(node_id) {
            debug!("node already current");
            return Ok(());
        }
        self.machine.dispatch(Action::BeginLoad(node_id.to_owned())).await?;
        match self.source.fetch(node_id).await {
            Ok(node) => {
                self.machine.dispatch(Action::NodeLoaded(node.clone())).await?;
                info!(history = self.snapshot().history.len(), "entered node");
                self.enter_node(&node);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load story node");
                self.audio.play_sound_effect(&self.cues.error, 1.0);
                self.machine
                    .dispatch(Action::LoadFailed(LOAD_FAILED_MESSAGE.to_owned()))
                    .await?;
                Err(err)
            }
        }
    }

    /// Starts the media for a freshly loaded node.
    pub fn enter_node(&self, node: &StoryNode) {
        if let Some(music) = node.background_music.as_deref() {
            self.audio.play_background_music(music);
        }
        if let Some(ambient) = node.ambient_sound.as_deref() {
            self.audio.play_sound_effect(ambient, AMBIENT_RELATIVE_VOLUME);
        }
        if let Some(effect) = node.entry_sound_effect.as_deref() {
            self.audio.play_sound_effect(effect, 1.0);
        }
        let narration = self.snapshot().narration_settings;
        if narration.enabled && narration.autoplay {
            self.narration.speak(&node.text, Some(&node.id));
        } else if self.narration.current_node().as_deref() != Some(node.id.as_str()) {
            self.narration.stop();
        }
    }

    /// Takes the choice at `index` of the current node and loads its
    /// target.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidChoice` if there is no such choice or
    /// its conditions do not hold; the state is unchanged. Load failures
    /// are returned as by [`StoryRuntime::go_to`].
    #[instrument(skip(self))]
    pub async fn choose(&mut self, index: usize) -> Result<(), DomainError> {
        let choice = self
            .machine
            .choices()
            .get(index)
            .map(|compiled| compiled.choice.clone());
        let outcome = match choice {
            Some(choice) => self.machine.dispatch(Action::ChoiceSelected(choice)).await,
            None => Err(DomainError::InvalidChoice(format!(
                "no choice at position {index}"
            ))),
        };
        match outcome {
            Ok(Dispatched::Advance(next)) => {
                self.audio.play_sound_effect(&self.cues.select, 1.0);
                self.go_to(&next).await
            }
            Ok(Dispatched::Applied) => Ok(()),
            Err(err) => {
                debug!(error = %err, "choice rejected");
                self.audio.play_sound_effect(&self.cues.invalid, 1.0);
                Err(err)
            }
        }
    }

    /// Resumes at the last visited node, or the start node without a
    /// saved game. A restored node that is already current is not fetched
    /// again; only its media is started.
    ///
    /// # Errors
    ///
    /// Load failures are returned as by [`StoryRuntime::go_to`].
    pub async fn continue_game(&mut self) -> Result<(), DomainError> {
        self.audio.play_sound_effect(&self.cues.continue_game, 1.0);
        let target = self
            .snapshot()
            .last_visited()
            .map_or_else(|| self.start_node.clone(), str::to_owned);
        let restored = self
            .snapshot()
            .current_node
            .as_ref()
            .filter(|node| node.id == target)
            .cloned();
        match restored {
            Some(node) => {
                debug!(node_id = %node.id, "continuing at restored node");
                self.enter_node(&node);
                Ok(())
            }
            None => self.go_to(&target).await,
        }
    }

    /// Starts over at the start node, keeping preferences.
    ///
    /// # Errors
    ///
    /// Load failures are returned as by [`StoryRuntime::go_to`].
    pub async fn new_game(&mut self) -> Result<(), DomainError> {
        self.narration.stop();
        self.machine.dispatch(Action::ResetGame).await?;
        self.audio.play_sound_effect(&self.cues.new_game, 1.0);
        let start = self.start_node.clone();
        self.go_to(&start).await
    }

    /// Applies a settings action (or any other action) directly.
    ///
    /// # Errors
    ///
    /// Propagates the state machine's rejection.
    pub async fn dispatch(&mut self, action: Action) -> Result<Dispatched, DomainError> {
        self.machine.dispatch(action).await
    }

    /// Flips mute and returns the new value.
    ///
    /// # Errors
    ///
    /// Propagates the state machine's rejection.
    pub async fn toggle_mute(&mut self) -> Result<bool, DomainError> {
        self.machine.dispatch(Action::ToggleMute).await?;
        Ok(self.snapshot().audio_settings.is_muted)
    }

    /// Enables or disables narration and returns the new value.
    ///
    /// # Errors
    ///
    /// Propagates the state machine's rejection.
    pub async fn toggle_narration(&mut self) -> Result<bool, DomainError> {
        self.machine.dispatch(Action::ToggleNarration).await?;
        Ok(self.snapshot().narration_settings.enabled)
    }

    /// Resumes paused narration, or narrates the current node.
    pub fn play_narration(&self) {
        if self.narration.state() == NarrationState::Paused {
            self.narration.resume();
            return;
        }
        if let Some(node) = self.snapshot().current_node.as_ref() {
            self.narration.speak(&node.text, Some(&node.id));
        }
    }

    /// Pauses narration.
    pub fn pause_narration(&self) {
        self.narration.pause();
    }

    /// Stops narration.
    pub fn stop_narration(&self) {
        self.narration.stop();
    }

    /// Stops all media and their timers.
    pub fn shutdown(&self) {
        self.narration.shutdown();
        self.audio.shutdown();
        info!("runtime shut down");
    }
}
