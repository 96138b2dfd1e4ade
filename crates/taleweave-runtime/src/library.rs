//! Story library — a `NodeSource` backed by a local story document.
//!
//! A story document is a JSON array or YAML list of story nodes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use taleweave_core::error::DomainError;
use taleweave_core::node::{NodeId, StoryNode};
use taleweave_core::source::NodeSource;
use taleweave_narrative::domain::expression::{CompiledChoice, ExpressionError};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::AppError;

/// A problem found by [`StoryLibrary::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryIssue {
    /// The configured start node does not exist.
    #[error("start node \"{0}\" does not exist")]
    MissingStartNode(NodeId),

    /// Two nodes share an id; the first one wins.
    #[error("node id \"{0}\" is defined more than once")]
    DuplicateId(NodeId),

    /// A choice leads to a node that does not exist.
    #[error("node \"{node}\", choice \"{choice}\": next node \"{target}\" does not exist")]
    DanglingTarget {
        /// Node holding the choice.
        node: NodeId,
        /// Choice label.
        choice: String,
        /// Missing target.
        target: NodeId,
    },

    /// A condition or effect does not parse.
    #[error("node \"{node}\", choice \"{choice}\": \"{expression}\": {error}")]
    MalformedExpression {
        /// Node holding the choice.
        node: NodeId,
        /// Choice label.
        choice: String,
        /// The authored expression.
        expression: String,
        /// Why it does not parse.
        error: ExpressionError,
    },
}

/// Story nodes indexed by id, in document order.
#[derive(Debug, Default)]
pub struct StoryLibrary {
    nodes: HashMap<NodeId, StoryNode>,
    order: Vec<NodeId>,
    duplicates: Vec<NodeId>,
}

impl StoryLibrary {
    /// Indexes `nodes`. For duplicate ids the first node wins.
    #[must_use]
    pub fn from_nodes(nodes: Vec<StoryNode>) -> Self {
        let mut library = Self::default();
        for node in nodes {
            if library.nodes.contains_key(&node.id) {
                library.duplicates.push(node.id);
                continue;
            }
            library.order.push(node.id.clone());
            library.nodes.insert(node.id.clone(), node);
        }
        library
    }

    /// Parses a JSON story document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Story` if the document is not a JSON array of nodes.
    pub fn from_json(document: &str) -> Result<Self, AppError> {
        serde_json::from_str(document)
            .map(Self::from_nodes)
            .map_err(|e| AppError::Story(format!("invalid JSON story: {e}")))
    }

    /// Parses a YAML story document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Story` if the document is not a YAML list of nodes.
    pub fn from_yaml(document: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(document)
            .map(Self::from_nodes)
            .map_err(|e| AppError::Story(format!("invalid YAML story: {e}")))
    }

    /// Reads a story document, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read and
    /// `AppError::Story` if the extension is unknown or parsing fails.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let document = tokio::fs::read_to_string(path).await?;
        let library = match extension.as_deref() {
            Some("json") => Self::from_json(&document)?,
            Some("yaml" | "yml") => Self::from_yaml(&document)?,
            _ => {
                return Err(AppError::Story(format!(
                    "{}: expected a .json, .yaml or .yml story",
                    path.display()
                )));
            }
        };
        info!(path = %path.display(), nodes = library.len(), "story loaded");
        Ok(library)
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the library holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks a node up by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    /// Checks the story for duplicate ids, a missing start node, dangling
    /// choice targets and malformed expressions. Issues are reported in
    /// document order.
    #[must_use]
    pub fn validate(&self, start_node: &str) -> Vec<StoryIssue> {
        let mut issues = Vec::new();
        if !self.nodes.contains_key(start_node) {
            issues.push(StoryIssue::MissingStartNode(start_node.to_owned()));
        }
        let mut reported = HashSet::new();
        for id in &self.duplicates {
            if reported.insert(id) {
                issues.push(StoryIssue::DuplicateId(id.clone()));
            }
        }
        for node in self.order.iter().filter_map(|id| self.nodes.get(id)) {
            for choice in &node.choices {
                if !self.nodes.contains_key(&choice.next) {
                    issues.push(StoryIssue::DanglingTarget {
                        node: node.id.clone(),
                        choice: choice.label.clone(),
                        target: choice.next.clone(),
                    });
                }
                let compiled = CompiledChoice::compile(choice);
                for (expression, error) in compiled.diagnostics() {
                    issues.push(StoryIssue::MalformedExpression {
                        node: node.id.clone(),
                        choice: choice.label.clone(),
                        expression: expression.to_owned(),
                        error: error.clone(),
                    });
                }
            }
        }
        debug!(issues = issues.len(), "story validated");
        issues
    }
}

#[async_trait]
impl NodeSource for StoryLibrary {
    async fn fetch(&self, node_id: &str) -> Result<StoryNode, DomainError> {
        self.nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| DomainError::NodeNotFound(node_id.to_owned()))
    }
}
