//! Test node sources — mock `NodeSource` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use taleweave_core::error::DomainError;
use taleweave_core::node::StoryNode;
use taleweave_core::source::NodeSource;

/// A node source backed by a fixed set of nodes that records every
/// requested id.
#[derive(Debug)]
pub struct StaticNodeSource {
    nodes: HashMap<String, StoryNode>,
    requested: Mutex<Vec<String>>,
}

impl StaticNodeSource {
    /// Creates a source serving `nodes`.
    #[must_use]
    pub fn new(nodes: Vec<StoryNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Returns every id passed to `fetch`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeSource for StaticNodeSource {
    async fn fetch(&self, node_id: &str) -> Result<StoryNode, DomainError> {
        self.requested.lock().unwrap().push(node_id.to_owned());
        self.nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| DomainError::NodeNotFound(node_id.to_owned()))
    }
}

/// A node source that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingNodeSource;

#[async_trait]
impl NodeSource for FailingNodeSource {
    async fn fetch(&self, _node_id: &str) -> Result<StoryNode, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
