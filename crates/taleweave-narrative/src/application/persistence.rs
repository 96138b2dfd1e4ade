//! Write-through persistence of `GameState`.
//!
//! The state is stored as one JSON document under [`STATE_KEY`], wrapped in
//! a versioned envelope. Decoding is strict: a snapshot missing required
//! fields, carrying another version, holding out-of-range settings, or
//! whose history does not end at the current node is rejected rather than
//! repaired or merged with defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taleweave_core::clock::Clock;
use taleweave_core::error::DomainError;
use taleweave_core::settings::{SPEECH_FACTOR_MAX, SPEECH_FACTOR_MIN};
use taleweave_core::store::KeyValueStore;
use tracing::{debug, warn};

use crate::domain::state::GameState;

/// Store key holding the serialized snapshot.
pub const STATE_KEY: &str = "storyState";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a saved game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// The saved state.
    pub state: GameState,
}

/// Wraps `state` in a snapshot envelope.
#[must_use]
pub fn encode_snapshot(state: &GameState, clock: &dyn Clock) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at: clock.now(),
        state: state.clone(),
    }
}

/// Decodes a snapshot envelope.
///
/// # Errors
///
/// Returns `DomainError::MalformedPersistedState` if the document does not
/// match the current format exactly or the state it holds is inconsistent.
/// A persisted in-flight load flag is cleared.
pub fn decode_snapshot(value: serde_json::Value) -> Result<GameState, DomainError> {
    let snapshot: Snapshot = serde_json::from_value(value)
        .map_err(|e| DomainError::MalformedPersistedState(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(DomainError::MalformedPersistedState(format!(
            "unsupported snapshot version {}, expected {SNAPSHOT_VERSION}",
            snapshot.version
        )));
    }
    let mut state = snapshot.state;
    check_settings(&state)?;
    check_history(&state)?;
    state.is_loading = false;
    Ok(state)
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), DomainError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DomainError::MalformedPersistedState(format!(
            "{name} {value} is outside [{min}, {max}]"
        )))
    }
}

fn check_settings(state: &GameState) -> Result<(), DomainError> {
    let audio = &state.audio_settings;
    check_range("masterVolume", audio.master_volume, 0.0, 1.0)?;
    check_range("musicVolume", audio.music_volume, 0.0, 1.0)?;
    check_range("effectsVolume", audio.effects_volume, 0.0, 1.0)?;
    let narration = &state.narration_settings;
    check_range("rate", narration.rate, SPEECH_FACTOR_MIN, SPEECH_FACTOR_MAX)?;
    check_range("pitch", narration.pitch, SPEECH_FACTOR_MIN, SPEECH_FACTOR_MAX)?;
    check_range("narration volume", narration.volume, 0.0, 1.0)
}

fn check_history(state: &GameState) -> Result<(), DomainError> {
    match state.current_node_id() {
        Some(current) if state.last_visited() != Some(current) => {
            Err(DomainError::MalformedPersistedState(format!(
                "history does not end at current node \"{current}\""
            )))
        }
        _ => Ok(()),
    }
}

/// Reads the saved game. Missing, unreadable, or malformed data yields
/// `None` with a warning.
pub async fn load(store: &dyn KeyValueStore) -> Option<GameState> {
    let raw = match store.get(STATE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no saved game found");
            return None;
        }
        Err(err) => {
            warn!(error = %err, "could not read saved game, using defaults");
            return None;
        }
    };
    let decoded = serde_json::from_str::<serde_json::Value>(&raw)
        .map_err(|e| DomainError::MalformedPersistedState(e.to_string()))
        .and_then(decode_snapshot);
    match decoded {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(error = %err, "ignoring saved game, using defaults");
            None
        }
    }
}

/// Writes `state` to the store. Failures are logged, never propagated.
pub async fn save(store: &dyn KeyValueStore, clock: &dyn Clock, state: &GameState) {
    let snapshot = encode_snapshot(state, clock);
    let raw = match serde_json::to_string(&snapshot) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "could not serialize game state");
            return;
        }
    };
    if let Err(err) = store.set(STATE_KEY, &raw).await {
        warn!(error = %err, "could not persist game state");
    }
}
