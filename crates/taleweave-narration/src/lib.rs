//! Text-to-speech narration for the Taleweave narrative runtime.
//!
//! A single narration session at a time over an injected speech engine.
//! Status changes are published on a broadcast channel.

pub mod config;
pub mod coordinator;
pub mod events;

pub use config::NarrationConfig;
pub use coordinator::NarrationCoordinator;
pub use events::{NarrationEvent, NarrationState};
