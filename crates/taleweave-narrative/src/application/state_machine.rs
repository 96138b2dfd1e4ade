//! The narrative state machine.
//!
//! Owns the canonical `GameState`. Every mutation goes through
//! [`NarrativeStateMachine::dispatch`], which validates the action, applies
//! it, pushes settings changes into the live media coordinators, and writes
//! the new state through to the store.

use std::sync::Arc;

use taleweave_core::clock::Clock;
use taleweave_core::control::{AudioControl, NarrationControl};
use taleweave_core::error::DomainError;
use taleweave_core::node::{Choice, StoryNode};
use taleweave_core::settings::{speech_factor, unit_volume};
use taleweave_core::store::KeyValueStore;
use tracing::{debug, info};

use crate::application::persistence;
use crate::domain::actions::{Action, Dispatched};
use crate::domain::expression::CompiledChoice;
use crate::domain::state::GameState;

fn compile_choices(node: Option<&StoryNode>) -> Vec<CompiledChoice> {
    node.map(|node| node.choices.iter().map(CompiledChoice::compile).collect())
        .unwrap_or_default()
}

/// Owner of the game state and its single mutation entry point.
pub struct NarrativeStateMachine {
    state: GameState,
    choices: Vec<CompiledChoice>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    audio: Arc<dyn AudioControl>,
    narration: Arc<dyn NarrationControl>,
}

impl NarrativeStateMachine {
    /// Creates the state machine from the saved game, or defaults when
    /// there is none, and reconciles both coordinators with its settings.
    pub async fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        audio: Arc<dyn AudioControl>,
        narration: Arc<dyn NarrationControl>,
    ) -> Self {
        let state = persistence::load(store.as_ref()).await.unwrap_or_default();
        audio.apply_settings(&state.audio_settings);
        narration.apply_settings(&state.narration_settings);
        info!(
            visited = state.history.len(),
            current = state.current_node_id().unwrap_or("-"),
            "narrative state ready"
        );
        Self {
            choices: compile_choices(state.current_node.as_ref()),
            state,
            store,
            clock,
            audio,
            narration,
        }
    }

    /// Read-only view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> &GameState {
        &self.state
    }

    /// The current node's choices, parsed.
    #[must_use]
    pub fn choices(&self) -> &[CompiledChoice] {
        &self.choices
    }

    /// Applies `action` and persists the result.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidChoice` if a selected choice is not
    /// offered by the current node or its conditions do not hold,
    /// `DomainError::MalformedPersistedState` if a snapshot cannot be
    /// decoded, and `DomainError::Validation` for NaN setting values. The
    /// state is unchanged on error.
    pub async fn dispatch(&mut self, action: Action) -> Result<Dispatched, DomainError> {
        let action_type = action.action_type();
        let outcome = self.reduce(action).inspect_err(|err| {
            debug!(action = action_type, error = %err, "action rejected");
        })?;
        persistence::save(self.store.as_ref(), self.clock.as_ref(), &self.state).await;
        debug!(action = action_type, "action applied");
        Ok(outcome)
    }

    fn reduce(&mut self, action: Action) -> Result<Dispatched, DomainError> {
        match action {
            Action::BeginLoad(node_id) => {
                debug!(node_id = %node_id, "loading node");
                self.state.is_loading = true;
                self.state.error = None;
            }
            Action::NodeLoaded(node) => {
                self.state.history.push(node.id.clone());
                self.choices = compile_choices(Some(&node));
                self.state.current_node = Some(node);
                self.state.is_loading = false;
                self.state.error = None;
            }
            Action::LoadFailed(message) => {
                self.state.error = Some(message);
                self.state.is_loading = false;
            }
            Action::ChoiceSelected(choice) => return self.select(&choice),
            Action::ResetGame => {
                self.state = GameState::with_settings(
                    self.state.audio_settings,
                    self.state.narration_settings,
                );
                self.choices.clear();
            }
            Action::LoadPersisted(snapshot) => {
                let state = persistence::decode_snapshot(snapshot)?;
                self.choices = compile_choices(state.current_node.as_ref());
                self.audio.apply_settings(&state.audio_settings);
                self.narration.apply_settings(&state.narration_settings);
                self.state = state;
            }
            Action::SetVolume(volume) => {
                let volume = unit_volume(volume)?;
                self.state.audio_settings.master_volume = volume;
                self.audio.set_master_volume(volume);
            }
            Action::SetMusicVolume(volume) => {
                let volume = unit_volume(volume)?;
                self.state.audio_settings.music_volume = volume;
                self.audio.set_music_volume(volume);
            }
            Action::SetEffectsVolume(volume) => {
                let volume = unit_volume(volume)?;
                self.state.audio_settings.effects_volume = volume;
                self.audio.set_effects_volume(volume);
            }
            Action::ToggleMute => {
                self.state.audio_settings.is_muted = self.audio.toggle_mute();
            }
            Action::ToggleNarration => {
                let settings = &mut self.state.narration_settings;
                settings.enabled = !settings.enabled;
                self.narration.apply_settings(settings);
            }
            Action::SetNarrationRate(rate) => {
                let rate = speech_factor(rate)?;
                self.state.narration_settings.rate = rate;
                self.narration.set_rate(rate);
            }
            Action::SetNarrationPitch(pitch) => {
                let pitch = speech_factor(pitch)?;
                self.state.narration_settings.pitch = pitch;
                self.narration.set_pitch(pitch);
            }
            Action::SetNarrationVolume(volume) => {
                let volume = unit_volume(volume)?;
                self.state.narration_settings.volume = volume;
                self.narration.set_volume(volume);
            }
            Action::SetNarrationVoice(index) => {
                self.state.narration_settings.voice_index = Some(index);
                self.narration.set_voice(index);
            }
            Action::ToggleAutoplay => {
                let settings = &mut self.state.narration_settings;
                settings.autoplay = !settings.autoplay;
                self.narration.apply_settings(settings);
            }
        }
        Ok(Dispatched::Applied)
    }

    /// Re-validates `choice` against the live state before applying its
    /// effects; a choice rendered from a stale snapshot is rejected.
    fn select(&mut self, choice: &Choice) -> Result<Dispatched, DomainError> {
        let compiled = self
            .choices
            .iter()
            .find(|compiled| compiled.choice == *choice)
            .ok_or_else(|| {
                DomainError::InvalidChoice(format!(
                    "\"{}\" is not offered by the current node",
                    choice.label
                ))
            })?;
        if !compiled.is_enabled(&self.state) {
            return Err(DomainError::InvalidChoice(format!(
                "conditions for \"{}\" are not met",
                choice.label
            )));
        }
        self.state = compiled.apply(&self.state);
        Ok(Dispatched::Advance(choice.next.clone()))
    }
}
