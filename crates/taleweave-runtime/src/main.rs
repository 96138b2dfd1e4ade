//! Taleweave headless player entry point.
//!
//! `taleweave [play]` plays the story named by `TALEWEAVE_STORY` in the
//! terminal. `taleweave check [story]` validates a story document.

use std::error::Error;
use std::sync::Arc;

use taleweave_core::clock::SystemClock;
use taleweave_core::error::DomainError;
use taleweave_runtime::backend::TracingAudioBackend;
use taleweave_runtime::config::RuntimeConfig;
use taleweave_runtime::error::AppError;
use taleweave_runtime::library::StoryLibrary;
use taleweave_runtime::runtime::{Collaborators, StoryRuntime};
use taleweave_runtime::store::FileStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "[1-9] choose  [c] continue  [n] new game  [m] mute  [v] narration  [q] quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("play") => {
            let config = RuntimeConfig::from_env()?;
            init_tracing(config.log_json);
            play(config).await?;
        }
        Some("check") => {
            let config = match args.next() {
                Some(path) => RuntimeConfig::from_lookup(|name| match name {
                    "TALEWEAVE_STORY" => Some(path.clone()),
                    _ => std::env::var(name).ok(),
                })?,
                None => RuntimeConfig::from_env()?,
            };
            init_tracing(config.log_json);
            check(&config).await?;
        }
        Some(other) => {
            return Err(AppError::Config(format!(
                "unknown command `{other}`; expected `play` or `check <story>`"
            ))
            .into());
        }
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn check(config: &RuntimeConfig) -> Result<(), AppError> {
    let library = StoryLibrary::load(&config.story_path).await?;
    let issues = library.validate(&config.start_node);
    if issues.is_empty() {
        println!(
            "{}: {} nodes, no issues",
            config.story_path.display(),
            library.len()
        );
        return Ok(());
    }
    for issue in &issues {
        println!("{}: {issue}", config.story_path.display());
    }
    Err(AppError::Story(format!("{} issue(s) found", issues.len())))
}

async fn play(config: RuntimeConfig) -> Result<(), AppError> {
    tracing::info!(story = %config.story_path.display(), "Starting Taleweave player");

    let library = StoryLibrary::load(&config.story_path).await?;
    for issue in library.validate(&config.start_node) {
        tracing::warn!(%issue, "story issue");
    }
    let collaborators = Collaborators {
        source: Arc::new(library),
        store: Arc::new(FileStore::new(&config.save_dir)),
        clock: Arc::new(SystemClock),
        audio_backend: Arc::new(TracingAudioBackend),
        speech: None,
    };
    let mut runtime = StoryRuntime::new(collaborators, &config).await;

    if runtime.has_saved_game() {
        println!("A saved game was found. [c] continue  [n] new game");
    } else {
        report(runtime.new_game().await);
        render(&runtime);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" => break,
            "" => continue,
            "c" => report(runtime.continue_game().await),
            "n" => report(runtime.new_game().await),
            "m" => match runtime.toggle_mute().await {
                Ok(muted) => println!("Sound {}", if muted { "off" } else { "on" }),
                Err(err) => report(Err(err)),
            },
            "v" => match runtime.toggle_narration().await {
                Ok(enabled) => println!("Narration {}", if enabled { "on" } else { "off" }),
                Err(err) => report(Err(err)),
            },
            input => match input.parse::<usize>() {
                Ok(number) if number >= 1 => report(runtime.choose(number - 1).await),
                _ => println!("{HELP}"),
            },
        }
        render(&runtime);
    }

    runtime.shutdown();
    Ok(())
}

fn report(result: Result<(), DomainError>) {
    if let Err(DomainError::InvalidChoice(reason)) = result {
        println!("You can't do that: {reason}");
    }
}

fn render(runtime: &StoryRuntime) {
    let state = runtime.snapshot();
    if let Some(error) = state.error.as_deref() {
        println!("! {error}");
    }
    let Some(node) = state.current_node.as_ref() else {
        println!("{HELP}");
        return;
    };
    println!("\n{}\n", node.text);
    for view in runtime.available_choices() {
        if view.enabled {
            println!("  {}. {}", view.index + 1, view.label);
        } else {
            println!(
                "  {}. {} (requires: {})",
                view.index + 1,
                view.label,
                view.unmet_conditions.join(", ")
            );
        }
    }
    if !state.inventory.is_empty() {
        let items: Vec<String> = state
            .inventory
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("\n  inventory: {}", items.join(", "));
    }
    println!("\n{HELP}");
}
