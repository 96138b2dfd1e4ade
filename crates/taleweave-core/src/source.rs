//! Node source abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::node::StoryNode;

/// Supplies story nodes by id. Transport and storage are the
/// implementor's concern.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetches the node with the given id.
    ///
    /// Implementations return `DomainError::NodeNotFound` when no node
    /// matches; any other error is treated the same way by the runtime.
    async fn fetch(&self, node_id: &str) -> Result<StoryNode, DomainError>;
}
