//! Cadenza - AI music composer
//!
//! Pick a genre, mood, tempo and duration; a hosted generative-text model
//! writes a composition description, and a looping clip plays while you
//! read it.
//!
//! # Usage
//!
//! ```bash
//! GEMINI_API_KEY=... cadenza
//! cadenza --config ./cadenza.toml
//! cadenza --no-audio
//! cadenza --volume 30
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - F11: Toggle fullscreen

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cadenza_core::config::{self, Config};

#[derive(Parser)]
#[command(name = "cadenza")]
#[command(author, version, about = "Cadenza - AI music composer")]
struct Args {
    /// Read settings from this file instead of the platform config directory
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable audio output (playback controls still work, silently)
    #[arg(long)]
    no_audio: bool,

    /// Initial volume (0-100), overrides the config file
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,
}

impl Args {
    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) {
        if self.no_audio {
            config.audio.enabled = false;
        }
        if let Some(volume) = self.volume {
            config.audio.initial_volume = volume;
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::load(args.config.as_deref());
    args.apply(&mut config);

    cadenza_studio::app::run(config)?;

    Ok(())
}
