//! The canonical game state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taleweave_core::node::{NodeId, StoryNode};
use taleweave_core::settings::{AudioSettings, NarrationSettings};

use super::expression::Category;
use super::value::Value;

/// Everything the runtime persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// The node on screen, once one has loaded.
    pub current_node: Option<StoryNode>,
    /// Items the player carries.
    pub inventory: BTreeMap<String, Value>,
    /// Story flags and counters.
    pub variables: BTreeMap<String, Value>,
    /// Visited node ids in traversal order. Append-only.
    pub history: Vec<NodeId>,
    /// Audio preferences.
    pub audio_settings: AudioSettings,
    /// Narration preferences.
    pub narration_settings: NarrationSettings,
    /// User-visible load failure message.
    pub error: Option<String>,
    /// Whether a node load is in flight.
    pub is_loading: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::with_settings(AudioSettings::default(), NarrationSettings::default())
    }
}

impl GameState {
    /// An empty game that keeps the given preferences.
    #[must_use]
    pub fn with_settings(audio: AudioSettings, narration: NarrationSettings) -> Self {
        Self {
            current_node: None,
            inventory: BTreeMap::new(),
            variables: BTreeMap::new(),
            history: Vec::new(),
            audio_settings: audio,
            narration_settings: narration,
            error: None,
            is_loading: false,
        }
    }

    /// Id of the node on screen.
    #[must_use]
    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node.as_ref().map(|node| node.id.as_str())
    }

    /// The most recently visited node, where a saved game resumes.
    #[must_use]
    pub fn last_visited(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    /// Looks up a value by category and key.
    #[must_use]
    pub fn lookup(&self, category: Category, key: &str) -> Option<&Value> {
        self.bucket(category).get(key)
    }

    pub(crate) fn bucket(&self, category: Category) -> &BTreeMap<String, Value> {
        match category {
            Category::Inventory => &self.inventory,
            Category::Variables => &self.variables,
        }
    }

    pub(crate) fn bucket_mut(&mut self, category: Category) -> &mut BTreeMap<String, Value> {
        match category {
            Category::Inventory => &mut self.inventory,
            Category::Variables => &mut self.variables,
        }
    }
}
