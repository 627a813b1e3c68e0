//! Cadenza Core - composition controller and text pipeline
//!
//! This crate holds everything the composer does that is not a window or
//! an audio device:
//!
//! - [`Composer`] - the parameter form controller and its
//!   `Idle → Loading → {Ready, Failed}` state machine
//! - [`CompositionTextService`] - the boundary to the hosted
//!   generative-text model, with [`GenerativeTextClient`] as the HTTP
//!   implementation
//! - [`format_composition`] - the text-to-markup transform
//! - [`AudioBackend`] / [`AudioSink`] - the seam the desktop app plugs its
//!   audio output into
//! - [`config`] - `config.toml` loading

pub mod config;
pub mod controller;
pub mod error;
pub mod formatter;
#[cfg(test)]
mod integration;
pub mod playback;
pub mod prompt;
pub mod service;
#[cfg(test)]
pub mod test_utils;

pub use cadenza_shared::{Field, SelectionState};
pub use config::Config;
pub use controller::{Composer, ComposerSnapshot, GeneratedComposition, PendingGeneration, Phase};
pub use error::{AudioError, ComposerError, ConfigError, GenerationError, ValidationError};
pub use formatter::{Segment, format_composition, markup_segments, strip_markers};
pub use playback::{AudioBackend, AudioSink, PlaybackState, SilentBackend};
pub use prompt::build_prompt;
pub use service::{CompositionTextService, GenerativeTextClient};
