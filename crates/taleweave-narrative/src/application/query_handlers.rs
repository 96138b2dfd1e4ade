//! Query handlers for the narrative state.
//!
//! Read-only views derived from the state machine for presentation.

use serde::Serialize;
use taleweave_core::node::NodeId;

use crate::application::state_machine::NarrativeStateMachine;

/// Read-only view of one choice of the current node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    /// Position in the node's choice list.
    pub index: usize,
    /// Button label.
    pub label: String,
    /// Target node.
    pub next: NodeId,
    /// Whether every condition currently holds.
    pub enabled: bool,
    /// Conditions that do not hold, as authored.
    pub unmet_conditions: Vec<String>,
}

/// Lists the current node's choices with their availability. Disabled
/// choices are included so the presentation can render them greyed out.
#[must_use]
pub fn available_choices(machine: &NarrativeStateMachine) -> Vec<ChoiceView> {
    let state = machine.snapshot();
    machine
        .choices()
        .iter()
        .enumerate()
        .map(|(index, compiled)| {
            let unmet: Vec<String> = compiled
                .unmet_conditions(state)
                .into_iter()
                .map(str::to_owned)
                .collect();
            ChoiceView {
                index,
                label: compiled.choice.label.clone(),
                next: compiled.choice.next.clone(),
                enabled: unmet.is_empty(),
                unmet_conditions: unmet,
            }
        })
        .collect()
}
