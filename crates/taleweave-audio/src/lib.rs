//! Audio coordination for the Taleweave narrative runtime.
//!
//! One background music channel with timed crossfades, plus a bounded pool
//! of fire-and-forget sound effect handles, all scaled by `AudioSettings`.

pub mod config;
pub mod coordinator;
mod effects;

pub use config::AudioConfig;
pub use coordinator::AudioCoordinator;
