//! Domain error types.

use thiserror::Error;

use crate::node::NodeId;

/// Top-level domain error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No story node matches the requested id.
    #[error("story node not found: {0}")]
    NodeNotFound(NodeId),

    /// A choice was dispatched that is not currently selectable.
    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    /// Persisted game state could not be decoded.
    #[error("malformed persisted state: {0}")]
    MalformedPersistedState(String),

    /// The platform refused to start audio playback.
    #[error("playback refused for {uri}: {reason}")]
    MediaPlaybackRefused {
        /// The source that failed to play.
        uri: String,
        /// Platform-provided reason.
        reason: String,
    },

    /// The text-to-speech engine reported a failure.
    #[error("speech engine error: {0}")]
    SpeechEngine(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
