//! Integration tests for the story runtime.

mod common;

use common::{Setup, build, settle};
use taleweave_core::error::DomainError;
use taleweave_narration::{NarrationEvent, NarrationState};
use taleweave_core::speech::Voice;
use taleweave_narrative::application::persistence::encode_snapshot;
use taleweave_narrative::domain::actions::Action;
use taleweave_narrative::domain::state::GameState;
use taleweave_narrative::domain::value::Value;
use taleweave_runtime::runtime::LOAD_FAILED_MESSAGE;
use taleweave_test_support::{EngineCall, FixedClock};

#[tokio::test(start_paused = true)]
async fn test_new_game_enters_start_node_with_media() {
    // Arrange
    let mut h = build(Setup::default()).await;

    // Act
    h.runtime.new_game().await.unwrap();
    settle().await;

    // Assert
    let state = h.runtime.snapshot();
    assert_eq!(state.history, vec!["start"]);
    assert_eq!(state.current_node_id(), Some("start"));
    assert_eq!(
        h.runtime.audio().current_track().as_deref(),
        Some("/music/cave.mp3")
    );
    let drip = &h.backend.handles_for("/sounds/drip.mp3")[0];
    assert!((drip.volume() - 0.105).abs() < 1e-5);
    assert_eq!(h.backend.handles_for("/sounds/start-game.mp3").len(), 1);
    assert!(h.runtime.has_saved_game());
}

#[tokio::test(start_paused = true)]
async fn test_choose_applies_effects_and_advances() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();

    // Act
    h.runtime.choose(0).await.unwrap();
    settle().await;

    // Assert
    let state = h.runtime.snapshot();
    assert_eq!(state.history, vec!["start", "tunnel"]);
    assert_eq!(state.inventory.get("torch"), Some(&Value::Bool(true)));
    assert_eq!(h.backend.handles_for("/sounds/select.mp3").len(), 1);
    assert_eq!(h.backend.handles_for("/sounds/steps.mp3").len(), 1);
    assert_eq!(
        h.runtime.audio().current_track().as_deref(),
        Some("/music/tunnel.mp3")
    );
    assert!(!h.backend.handles_for("/music/cave.mp3")[0].is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_choice_is_rejected_with_invalid_cue() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    let views = h.runtime.available_choices();
    let before = h.runtime.snapshot().clone();

    // Act
    let result = h.runtime.choose(1).await;

    // Assert
    assert!(!views[1].enabled);
    assert_eq!(views[1].unmet_conditions, vec!["inventory.torch = true"]);
    assert!(matches!(result, Err(DomainError::InvalidChoice(_))));
    assert_eq!(*h.runtime.snapshot(), before);
    assert_eq!(h.backend.handles_for("/sounds/invalid.mp3").len(), 1);
    assert!(h.backend.handles_for("/sounds/select.mp3").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_choice_is_rejected() {
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();

    let result = h.runtime.choose(7).await;

    assert!(matches!(result, Err(DomainError::InvalidChoice(_))));
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_records_message_and_keeps_node() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    h.runtime.choose(0).await.unwrap();

    // Act
    let result = h.runtime.choose(1).await;

    // Assert
    assert_eq!(result, Err(DomainError::NodeNotFound("crack".into())));
    let state = h.runtime.snapshot();
    assert_eq!(state.error.as_deref(), Some(LOAD_FAILED_MESSAGE));
    assert!(!state.is_loading);
    assert_eq!(state.current_node_id(), Some("tunnel"));
    assert_eq!(state.history, vec!["start", "tunnel"]);
    assert_eq!(h.backend.handles_for("/sounds/error.mp3").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_successful_load_clears_previous_error() {
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    h.runtime.choose(0).await.unwrap();
    let _ = h.runtime.choose(1).await;

    h.runtime.choose(0).await.unwrap();

    assert_eq!(h.runtime.snapshot().error, None);
    assert_eq!(h.runtime.snapshot().current_node_id(), Some("start"));
}

#[tokio::test(start_paused = true)]
async fn test_continue_game_restores_saved_node_without_refetch() {
    // Arrange
    let mut first = build(Setup::default()).await;
    let store = first.store.clone();
    first.runtime.new_game().await.unwrap();
    first.runtime.choose(0).await.unwrap();
    first.runtime.shutdown();

    let mut second = build(Setup {
        store: Some(store),
        ..Setup::default()
    })
    .await;

    // Act
    second.runtime.continue_game().await.unwrap();

    // Assert
    assert!(second.runtime.has_saved_game());
    assert_eq!(second.runtime.snapshot().current_node_id(), Some("tunnel"));
    assert_eq!(
        second.runtime.snapshot().inventory.get("torch"),
        Some(&Value::Bool(true))
    );
    assert!(second.source.requested().is_empty());
    assert_eq!(
        second.runtime.audio().current_track().as_deref(),
        Some("/music/tunnel.mp3")
    );
    assert_eq!(second.backend.handles_for("/sounds/continue-game.mp3").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_continue_without_saved_game_loads_start() {
    let mut h = build(Setup::default()).await;

    h.runtime.continue_game().await.unwrap();

    assert_eq!(h.source.requested(), vec!["start"]);
    assert_eq!(h.runtime.snapshot().history, vec!["start"]);
}

#[tokio::test(start_paused = true)]
async fn test_new_game_preserves_settings_and_clears_progress() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    h.runtime.choose(0).await.unwrap();
    h.runtime.dispatch(Action::SetMusicVolume(0.8)).await.unwrap();

    // Act
    h.runtime.new_game().await.unwrap();

    // Assert
    let state = h.runtime.snapshot();
    assert_eq!(state.audio_settings.music_volume, 0.8);
    assert!(state.inventory.is_empty());
    assert_eq!(state.history, vec!["start"]);
}

#[tokio::test(start_paused = true)]
async fn test_mute_suppresses_cues_and_persists() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();

    // Act
    let muted = h.runtime.toggle_mute().await.unwrap();
    h.runtime.choose(0).await.unwrap();

    // Assert
    assert!(muted);
    assert!(h.runtime.audio().settings().is_muted);
    assert!(h.backend.handles_for("/sounds/select.mp3").is_empty());
    assert!(h.backend.handles_for("/music/tunnel.mp3")[0].is_muted());
    let saved = h.store.value("storyState").unwrap();
    assert!(saved.contains("\"isMuted\":true"));
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_narrates_each_entered_node() {
    // Arrange
    let mut h = build(Setup {
        with_speech: true,
        ..Setup::default()
    })
    .await;
    let engine = h.engine.clone().unwrap();
    assert!(h.runtime.toggle_narration().await.unwrap());

    // Act
    h.runtime.new_game().await.unwrap();
    settle().await;
    h.runtime.choose(0).await.unwrap();
    settle().await;

    // Assert
    let spoken: Vec<String> = engine.spoken().into_iter().map(|u| u.text).collect();
    assert_eq!(spoken, vec!["You wake in a cave.", "The tunnel is dark."]);
    assert_eq!(h.runtime.narration().current_node().as_deref(), Some("tunnel"));
}

#[tokio::test(start_paused = true)]
async fn test_entering_node_without_autoplay_stops_stale_narration() {
    // Arrange
    let mut h = build(Setup {
        with_speech: true,
        ..Setup::default()
    })
    .await;
    let engine = h.engine.clone().unwrap();
    h.runtime.toggle_narration().await.unwrap();
    h.runtime.new_game().await.unwrap();
    settle().await;
    let session = h.runtime.narration().session().unwrap();
    engine.emit_started(session);
    settle().await;
    h.runtime.dispatch(Action::ToggleAutoplay).await.unwrap();

    // Act
    h.runtime.choose(0).await.unwrap();

    // Assert
    assert_eq!(h.runtime.narration().state(), NarrationState::Idle);
    assert_eq!(engine.calls().last(), Some(&EngineCall::Cancel));
    assert_eq!(engine.spoken().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_narration_stops_speech() {
    let mut h = build(Setup {
        with_speech: true,
        ..Setup::default()
    })
    .await;
    h.runtime.toggle_narration().await.unwrap();
    h.runtime.new_game().await.unwrap();

    let enabled = h.runtime.toggle_narration().await.unwrap();
    settle().await;

    assert!(!enabled);
    assert!(h.engine.unwrap().spoken().is_empty());
    assert_eq!(h.runtime.narration().state(), NarrationState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_play_narration_without_engine_finishes_immediately() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    let mut events = h.runtime.subscribe_narration();

    // Act
    h.runtime.play_narration();

    // Assert
    assert!(!h.runtime.narration().is_supported());
    assert!(matches!(events.try_recv(), Ok(NarrationEvent::Finished(_))));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_media() {
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();

    h.runtime.shutdown();
    settle().await;

    assert!(h.backend.handles().iter().all(|handle| !handle.is_playing()));
    assert!(!h.runtime.audio().is_crossfading());
}

#[tokio::test(start_paused = true)]
async fn test_chosen_voice_survives_restart() {
    // Arrange
    let voices = vec![Voice::new("Daniel", "en-GB"), Voice::new("Samantha", "en-US")];
    let mut first = build(Setup {
        with_speech: true,
        voices: voices.clone(),
        ..Setup::default()
    })
    .await;
    let store = first.store.clone();
    first.runtime.toggle_narration().await.unwrap();
    first.runtime.dispatch(Action::SetNarrationVoice(1)).await.unwrap();
    first.runtime.shutdown();

    // Act
    let mut second = build(Setup {
        store: Some(store),
        with_speech: true,
        voices,
    })
    .await;
    second.runtime.new_game().await.unwrap();
    settle().await;

    // Assert
    let samantha = Voice::new("Samantha", "en-US");
    assert_eq!(
        second.runtime.snapshot().narration_settings.voice_index,
        Some(1)
    );
    assert_eq!(second.runtime.narration().selected_voice(), Some(samantha.clone()));
    let engine = second.engine.unwrap();
    assert_eq!(engine.spoken()[0].voice, Some(samantha));
}

#[tokio::test(start_paused = true)]
async fn test_loading_snapshot_with_excessive_volume_keeps_music_in_range() {
    // Arrange
    let mut h = build(Setup::default()).await;
    h.runtime.new_game().await.unwrap();
    settle().await;
    let mut saved = GameState::default();
    saved.audio_settings.master_volume = 5.0;
    saved.audio_settings.music_volume = 1.0;
    let snapshot = serde_json::to_value(encode_snapshot(&saved, &FixedClock::default())).unwrap();

    // Act
    let result = h.runtime.dispatch(Action::LoadPersisted(snapshot)).await;
    settle().await;

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::MalformedPersistedState(_))
    ));
    assert_eq!(h.runtime.snapshot().audio_settings.master_volume, 0.5);
    let music = &h.backend.handles_for("/music/cave.mp3")[0];
    assert!(music.volume() <= 1.0);
    assert!((music.volume() - 0.15).abs() < 1e-5);
}
