//! Taleweave Core — shared domain abstractions.
//!
//! This crate defines the story model, the error taxonomy, and the
//! capability traits that every bounded context depends on. It contains no
//! media or storage implementations; those are injected.

pub mod clock;
pub mod control;
pub mod error;
pub mod node;
pub mod playback;
pub mod settings;
pub mod source;
pub mod speech;
pub mod store;
