//! Key-value persistence abstraction.

use async_trait::async_trait;

use crate::error::DomainError;

/// A string key-value store used for write-through persistence of game
/// state.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backend cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;
}
