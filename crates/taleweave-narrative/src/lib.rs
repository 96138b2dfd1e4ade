//! Taleweave — Narrative state.
//!
//! Responsible for the condition/effect language that gates and mutates
//! game state, and for the state machine that tracks the current node,
//! traversal history, and persisted settings.

pub mod application;
pub mod domain;
