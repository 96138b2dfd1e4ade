//! Domain model for narrative state.

pub mod actions;
pub mod expression;
pub mod state;
pub mod value;
