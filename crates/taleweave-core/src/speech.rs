//! Text-to-speech engine capability.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::DomainError;

/// A voice offered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Display name.
    pub name: String,
    /// BCP 47 locale tag, e.g. `en-GB`.
    pub lang: String,
}

impl Voice {
    /// Creates a voice.
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// One request to speak text.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Session identifier echoed back in engine events.
    pub id: Uuid,
    /// Text to speak.
    pub text: String,
    /// Voice to use; `None` leaves the engine default.
    pub voice: Option<Voice>,
    /// Speech rate.
    pub rate: f32,
    /// Speech pitch.
    pub pitch: f32,
    /// Speech volume.
    pub volume: f32,
}

/// A live property change for an utterance already handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UtteranceUpdate {
    /// New rate.
    Rate(f32),
    /// New pitch.
    Pitch(f32),
    /// New volume.
    Volume(f32),
}

/// Notifications raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The utterance began playing.
    Started(Uuid),
    /// The utterance played to completion.
    Ended(Uuid),
    /// The utterance was aborted by the engine.
    Failed {
        /// The affected utterance.
        utterance: Uuid,
        /// Engine-provided error detail.
        detail: String,
    },
    /// The voice list changed (asynchronous voice discovery).
    VoicesChanged,
}

/// Channel the engine reports events on.
pub type EngineEventSink = mpsc::UnboundedSender<EngineEvent>;

/// A platform text-to-speech engine.
pub trait SpeechEngine: Send + Sync {
    /// Registers the sink that receives all subsequent engine events.
    fn attach(&self, sink: EngineEventSink);

    /// Returns the voices discovered so far. May be empty until the engine
    /// raises `EngineEvent::VoicesChanged`.
    fn voices(&self) -> Vec<Voice>;

    /// Queues an utterance. Start is confirmed by `EngineEvent::Started`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SpeechEngine` if the engine rejects the request.
    fn speak(&self, utterance: Utterance) -> Result<(), DomainError>;

    /// Pauses the active utterance.
    fn pause(&self);

    /// Resumes a paused utterance.
    fn resume(&self);

    /// Cancels the active and any queued utterances.
    fn cancel(&self);

    /// Applies `update` to an utterance in flight. Returns `false` when the
    /// engine cannot change a pending utterance; the value then takes effect
    /// on the next utterance.
    fn update(&self, utterance: Uuid, update: UtteranceUpdate) -> bool;
}

/// Picks the default voice: the first English (`en-`) voice, else the first
/// voice, else none.
#[must_use]
pub fn default_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|voice| voice.lang.starts_with("en-"))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice_prefers_english() {
        let voices = vec![
            Voice::new("Amélie", "fr-FR"),
            Voice::new("Daniel", "en-GB"),
            Voice::new("Samantha", "en-US"),
        ];
        assert_eq!(default_voice(&voices).map(|v| v.name.as_str()), Some("Daniel"));
    }

    #[test]
    fn test_default_voice_falls_back_to_first() {
        let voices = vec![Voice::new("Anna", "de-DE"), Voice::new("Amélie", "fr-FR")];
        assert_eq!(default_voice(&voices).map(|v| v.name.as_str()), Some("Anna"));
    }

    #[test]
    fn test_default_voice_none_when_no_voices() {
        assert!(default_voice(&[]).is_none());
    }
}
