//! Story graph records.
//!
//! Nodes are owned by the external `NodeSource`; the runtime only holds
//! clones of the node currently on screen.

use serde::{Deserialize, Serialize};

/// Identifier of a story node.
pub type NodeId = String;

/// One unit of narrative content with its outgoing choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryNode {
    /// Unique node identifier.
    pub id: NodeId,
    /// Narrative text shown (and optionally narrated) on entry.
    pub text: String,
    /// Outgoing choices, in display order.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Looping background track to crossfade to on entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<String>,
    /// Ambient sound played once on entry at reduced volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_sound: Option<String>,
    /// Sound effect played once on entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_sound_effect: Option<String>,
    /// Illustration shown by the presentation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StoryNode {
    /// Returns the choice at `index`, if any.
    #[must_use]
    pub fn choice(&self, index: usize) -> Option<&Choice> {
        self.choices.get(index)
    }
}

/// A labeled transition to another node, optionally gated and mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Text shown on the choice button.
    pub label: String,
    /// Target node.
    pub next: NodeId,
    /// Condition expressions; all must hold for the choice to be enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    /// Effect expressions applied in order on selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
}
