//! Shared test helpers for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use taleweave_core::clock::Clock;
use taleweave_core::node::{Choice, StoryNode};
use taleweave_core::speech::{SpeechEngine, Voice};
use taleweave_runtime::config::RuntimeConfig;
use taleweave_runtime::runtime::{Collaborators, StoryRuntime};
use taleweave_test_support::{
    FixedClock, MemoryStore, RecordingAudioBackend, ScriptedSpeechEngine, StaticNodeSource,
};

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::default())
}

fn node(id: &str, text: &str, choices: Vec<Choice>) -> StoryNode {
    StoryNode {
        id: id.into(),
        text: text.into(),
        choices,
        background_music: None,
        ambient_sound: None,
        entry_sound_effect: None,
        image: None,
    }
}

fn choice(label: &str, next: &str, conditions: &[&str], effects: &[&str]) -> Choice {
    Choice {
        label: label.into(),
        next: next.into(),
        conditions: conditions.iter().map(|c| (*c).to_owned()).collect(),
        effects: effects.iter().map(|e| (*e).to_owned()).collect(),
    }
}

/// A three-node cave story. `tunnel` has a choice leading to a node that
/// does not exist.
pub fn cave_story() -> Vec<StoryNode> {
    let mut start = node(
        "start",
        "You wake in a cave.",
        vec![
            choice("Take the torch", "tunnel", &[], &["inventory.torch = true"]),
            choice("Light the way", "exit", &["inventory.torch = true"], &[]),
        ],
    );
    start.background_music = Some("/music/cave.mp3".into());
    start.ambient_sound = Some("/sounds/drip.mp3".into());

    let mut tunnel = node(
        "tunnel",
        "The tunnel is dark.",
        vec![
            choice("Go back", "start", &[], &["variables.steps += 1"]),
            choice("Squeeze through the crack", "crack", &[], &[]),
        ],
    );
    tunnel.background_music = Some("/music/tunnel.mp3".into());
    tunnel.entry_sound_effect = Some("/sounds/steps.mp3".into());

    vec![start, tunnel, node("exit", "Daylight.", vec![])]
}

/// A runtime wired to recording mocks.
pub struct Harness {
    pub runtime: StoryRuntime,
    pub source: Arc<StaticNodeSource>,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<RecordingAudioBackend>,
    pub engine: Option<Arc<ScriptedSpeechEngine>>,
}

/// Options for [`build`].
#[derive(Default)]
pub struct Setup {
    pub store: Option<Arc<MemoryStore>>,
    pub with_speech: bool,
    /// Voices the speech engine offers; a single en-GB voice when empty.
    pub voices: Vec<Voice>,
}

/// Builds a runtime over the cave story.
pub async fn build(setup: Setup) -> Harness {
    let source = Arc::new(StaticNodeSource::new(cave_story()));
    let store = setup.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
    let backend = Arc::new(RecordingAudioBackend::new());
    let voices = if setup.voices.is_empty() {
        vec![Voice::new("Daniel", "en-GB")]
    } else {
        setup.voices
    };
    let engine = setup
        .with_speech
        .then(|| Arc::new(ScriptedSpeechEngine::new(voices)));
    let speech = engine
        .clone()
        .map(|engine| -> Arc<dyn SpeechEngine> { engine });
    let runtime = StoryRuntime::new(
        Collaborators {
            source: source.clone(),
            store: store.clone(),
            clock: fixed_clock(),
            audio_backend: backend.clone(),
            speech,
        },
        &RuntimeConfig::new("cave.yaml"),
    )
    .await;
    Harness {
        runtime,
        source,
        store,
        backend,
        engine,
    }
}

/// Lets crossfades, narration start delays and engine events run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}
