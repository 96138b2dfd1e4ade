//! Actions accepted by the narrative state machine.

use taleweave_core::node::{Choice, NodeId, StoryNode};

/// Every state transition the runtime can request.
#[derive(Debug, Clone)]
pub enum Action {
    /// A fetch for the node has started.
    BeginLoad(NodeId),
    /// A fetch completed with this node.
    NodeLoaded(StoryNode),
    /// A fetch failed with this user-visible message.
    LoadFailed(String),
    /// The player picked a choice of the current node.
    ChoiceSelected(Choice),
    /// Start over, keeping preferences.
    ResetGame,
    /// Replace everything with a previously serialized snapshot.
    LoadPersisted(serde_json::Value),
    /// Set the master gain.
    SetVolume(f32),
    /// Set the music gain.
    SetMusicVolume(f32),
    /// Set the effects gain.
    SetEffectsVolume(f32),
    /// Flip the mute flag.
    ToggleMute,
    /// Enable or disable narration.
    ToggleNarration,
    /// Set the speech rate.
    SetNarrationRate(f32),
    /// Set the speech pitch.
    SetNarrationPitch(f32),
    /// Set the speech volume.
    SetNarrationVolume(f32),
    /// Select the voice at this index.
    SetNarrationVoice(usize),
    /// Enable or disable narration on node entry.
    ToggleAutoplay,
}

impl Action {
    /// The action type name (for logging).
    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::BeginLoad(_) => "narrative.begin_load",
            Self::NodeLoaded(_) => "narrative.node_loaded",
            Self::LoadFailed(_) => "narrative.load_failed",
            Self::ChoiceSelected(_) => "narrative.choice_selected",
            Self::ResetGame => "narrative.reset_game",
            Self::LoadPersisted(_) => "narrative.load_persisted",
            Self::SetVolume(_) => "settings.set_volume",
            Self::SetMusicVolume(_) => "settings.set_music_volume",
            Self::SetEffectsVolume(_) => "settings.set_effects_volume",
            Self::ToggleMute => "settings.toggle_mute",
            Self::ToggleNarration => "settings.toggle_narration",
            Self::SetNarrationRate(_) => "settings.set_narration_rate",
            Self::SetNarrationPitch(_) => "settings.set_narration_pitch",
            Self::SetNarrationVolume(_) => "settings.set_narration_volume",
            Self::SetNarrationVoice(_) => "settings.set_narration_voice",
            Self::ToggleAutoplay => "settings.toggle_autoplay",
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The state changed; nothing else to do.
    Applied,
    /// A choice was taken; the caller should load this node next.
    Advance(NodeId),
}
