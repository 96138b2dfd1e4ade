//! Taleweave runtime — composes the narrative state machine with the audio
//! and narration coordinators behind a single player-facing API.

pub mod backend;
pub mod config;
pub mod error;
pub mod library;
pub mod runtime;
pub mod store;
