//! Runtime configuration.
//!
//! Read from `TALEWEAVE_*` environment variables by the player binary.

use std::path::PathBuf;

use taleweave_audio::AudioConfig;
use taleweave_core::node::NodeId;
use taleweave_narration::NarrationConfig;

use crate::error::AppError;

/// UI sound cue sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCues {
    /// An enabled choice was selected.
    pub select: String,
    /// A choice was rejected.
    pub invalid: String,
    /// A node failed to load.
    pub error: String,
    /// A new game started.
    pub new_game: String,
    /// A saved game was continued.
    pub continue_game: String,
}

impl Default for SoundCues {
    fn default() -> Self {
        Self {
            select: "/sounds/select.mp3".into(),
            invalid: "/sounds/invalid.mp3".into(),
            error: "/sounds/error.mp3".into(),
            new_game: "/sounds/start-game.mp3".into(),
            continue_game: "/sounds/continue-game.mp3".into(),
        }
    }
}

/// Everything the runtime and the player binary need to start.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Story document (`.json`, `.yaml` or `.yml`).
    pub story_path: PathBuf,
    /// Directory holding saved games.
    pub save_dir: PathBuf,
    /// Node a new game starts at.
    pub start_node: NodeId,
    /// Emit JSON log lines.
    pub log_json: bool,
    /// UI sound cues.
    pub cues: SoundCues,
    /// Crossfade and effect pool tuning.
    pub audio: AudioConfig,
    /// Narration start delay and channel sizing.
    pub narration: NarrationConfig,
}

impl RuntimeConfig {
    /// Defaults for everything except the story document.
    #[must_use]
    pub fn new(story_path: impl Into<PathBuf>) -> Self {
        Self {
            story_path: story_path.into(),
            save_dir: PathBuf::from("./saves"),
            start_node: "start".into(),
            log_json: false,
            cues: SoundCues::default(),
            audio: AudioConfig::default(),
            narration: NarrationConfig::default(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `TALEWEAVE_STORY` is not set.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `TALEWEAVE_STORY` is missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let story = lookup("TALEWEAVE_STORY")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("TALEWEAVE_STORY environment variable must be set".into())
            })?;
        let mut config = Self::new(story);
        if let Some(dir) = lookup("TALEWEAVE_SAVE_DIR") {
            config.save_dir = PathBuf::from(dir);
        }
        if let Some(start) = lookup("TALEWEAVE_START_NODE").filter(|value| !value.is_empty()) {
            config.start_node = start;
        }
        config.log_json = lookup("TALEWEAVE_LOG_JSON").is_some_and(|value| is_truthy(&value));
        Ok(config)
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_applies_defaults() {
        // Arrange
        let vars = lookup(&[("TALEWEAVE_STORY", "stories/cave.yaml")]);

        // Act
        let config = RuntimeConfig::from_lookup(vars).unwrap();

        // Assert
        assert_eq!(config.story_path, PathBuf::from("stories/cave.yaml"));
        assert_eq!(config.save_dir, PathBuf::from("./saves"));
        assert_eq!(config.start_node, "start");
        assert!(!config.log_json);
        assert_eq!(config.cues.select, "/sounds/select.mp3");
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let vars = lookup(&[
            ("TALEWEAVE_STORY", "story.json"),
            ("TALEWEAVE_SAVE_DIR", "/tmp/saves"),
            ("TALEWEAVE_START_NODE", "prologue"),
            ("TALEWEAVE_LOG_JSON", "TRUE"),
        ]);

        let config = RuntimeConfig::from_lookup(vars).unwrap();

        assert_eq!(config.save_dir, PathBuf::from("/tmp/saves"));
        assert_eq!(config.start_node, "prologue");
        assert!(config.log_json);
    }

    #[test]
    fn test_from_lookup_requires_story() {
        let result = RuntimeConfig::from_lookup(lookup(&[("TALEWEAVE_STORY", "  ")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" Yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
