//! Narration status.

use uuid::Uuid;

/// Status notifications. Each carries the session id returned by `speak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationEvent {
    /// The engine confirmed the session started.
    Started(Uuid),
    /// The session was paused.
    Paused(Uuid),
    /// The session was resumed.
    Resumed(Uuid),
    /// The session was stopped or superseded before it finished.
    Stopped(Uuid),
    /// The session played to the end, failed in the engine, or could not
    /// start at all.
    Finished(Uuid),
}

impl NarrationEvent {
    /// The session this event belongs to.
    #[must_use]
    pub fn session(&self) -> Uuid {
        match *self {
            Self::Started(id)
            | Self::Paused(id)
            | Self::Resumed(id)
            | Self::Stopped(id)
            | Self::Finished(id) => id,
        }
    }
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    /// Nothing to say.
    Idle,
    /// `speak` was called; the engine has not confirmed the start yet.
    Starting,
    /// The engine is speaking.
    Speaking,
    /// The engine is paused mid-utterance.
    Paused,
}
