//! Error types for the composer.
//!
//! Only two kinds reach the user: [`ValidationError`] (a selection is
//! missing, shown synchronously) and [`GenerationError`] (anything that went
//! wrong talking to the text service, logged and surfaced as "no new
//! composition"). Audio failures are logged and never interrupt generation.

use cadenza_shared::Field;
use thiserror::Error;

/// The selection form is not ready for generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select all fields before generating music (missing: {})", join_fields(.0))]
    MissingFields(Vec<Field>),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The text service failed to produce a composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API credential not found in environment variable {0}")]
    MissingCredential(String),
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Response contained no text")]
    EmptyResponse,
}

/// Errors returned by [`crate::Composer::generate`] and
/// [`crate::Composer::begin_generation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A request is already outstanding; the new one is ignored
    #[error("A composition is already being generated")]
    Busy,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Audio output failures. Logged only.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output device available")]
    NoDevice,
    #[error("Audio stream error: {0}")]
    Stream(String),
    #[error("Failed to decode audio clip: {0}")]
    Decode(String),
    #[error("Failed to fetch audio clip: {0}")]
    Fetch(String),
    #[error("Unsupported audio format: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
