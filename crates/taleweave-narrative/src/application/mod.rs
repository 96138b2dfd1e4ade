//! Application services for narrative state.

pub mod persistence;
pub mod query_handlers;
pub mod state_machine;
