//! Audio output for the composer
//!
//! One fixed clip is loaded in the background and looped through a cpal
//! stream:
//! - [`clip`] - WAV loading (local path or http(s) URL) and the loop cursor
//! - [`output`] - [`ClipBackend`] / [`ClipSink`], the cpal implementation of
//!   the composer's audio seam

pub mod clip;
pub mod output;

pub use clip::{Clip, LoopCursor, decode_wav, load_clip, load_clip_blocking};
pub use output::{ClipBackend, ClipSink, ClipSlot, ClipState};

use std::thread;

use cadenza_core::config::AudioConfig;

/// Builds the backend for the configured clip.
///
/// Returns immediately. The clip loads on a background thread; until it
/// arrives sinks play silence. Disabled audio or a failed load gives a
/// silent backend.
pub fn backend_from_config(config: &AudioConfig) -> ClipBackend {
    if !config.enabled {
        tracing::info!("Audio disabled");
        return ClipBackend::new_stub();
    }

    let slot = ClipSlot::pending();
    let loader = slot.clone();
    let source = config.clip.clone();

    let spawned = thread::Builder::new()
        .name("clip-loader".into())
        .spawn(move || {
            tracing::info!("Loading audio clip from {}", source);
            match load_clip_blocking(&source) {
                Ok(clip) => {
                    tracing::info!(
                        "Loaded clip: {:.1}s, {} Hz, {} channels",
                        clip.duration().as_secs_f32(),
                        clip.sample_rate,
                        clip.channels
                    );
                    loader.fill(Some(clip));
                }
                Err(e) => {
                    tracing::warn!("Failed to load audio clip: {}. Audio disabled.", e);
                    loader.fill(None);
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start clip loader: {}. Audio disabled.", e);
        return ClipBackend::new_stub();
    }

    ClipBackend::with_slot(slot)
}
