//! Shared test mocks and utilities for the Taleweave narrative runtime.

mod audio;
mod clock;
mod control;
mod source;
mod speech;
mod store;

pub use audio::{HandleRecord, RecordingAudioBackend};
pub use clock::FixedClock;
pub use control::{AudioCall, NarrationCall, RecordingAudioControl, RecordingNarrationControl};
pub use source::{FailingNodeSource, StaticNodeSource};
pub use speech::{EngineCall, ScriptedSpeechEngine};
pub use store::{FailingStore, MemoryStore};
