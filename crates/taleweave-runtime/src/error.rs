//! Taleweave runtime — startup error types.

use taleweave_core::error::DomainError;
use thiserror::Error;

/// Startup and command errors for the player binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The story document could not be read or parsed.
    #[error("story error: {0}")]
    Story(String),

    /// Terminal or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
