//! Configuration management (config.toml)
//!
//! Handles loading and providing defaults for application settings.
//! Settings are read from TOML in the platform-specific config directory.
//! The API credential is never stored here; `api.key_env` only names the
//! environment variable that holds it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application configuration.
///
/// Contains all user-configurable settings organized into sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generative-text API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Audio settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Window settings
    #[serde(default)]
    pub ui: UiConfig,
}

/// Generative-text API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API (default: Google generative language v1beta)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model name (default: gemini-1.5-pro)
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the API key (default: GEMINI_API_KEY)
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Whether audio output is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Looping clip: local path or http(s) URL of a WAV file
    #[serde(default = "default_clip")]
    pub clip: String,
    /// Initial volume (default: 50, range: 0-100)
    #[serde(default = "default_volume")]
    pub initial_volume: u8,
}

/// Window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Whether to start in fullscreen mode (default: false)
    #[serde(default)]
    pub fullscreen: bool,
    /// Initial window width in points (default: 900)
    #[serde(default = "default_width")]
    pub width: f32,
    /// Initial window height in points (default: 720)
    #[serde(default = "default_height")]
    pub height: f32,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}
fn default_clip() -> String {
    "https://www2.cs.uic.edu/~i101/SoundFiles/BabyElephantWalk60.wav".to_string()
}
fn default_volume() -> u8 {
    50
}

fn default_width() -> f32 {
    900.0
}
fn default_height() -> f32 {
    720.0
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            key_env: default_key_env(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            clip: default_clip(),
            initial_volume: default_volume(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Config {
    /// Checks values serde cannot express as types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api.endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.api.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api.model",
                reason: "must not be empty".to_string(),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "api.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.audio.initial_volume > 100 {
            return Err(ConfigError::Invalid {
                key: "audio.initial_volume",
                reason: format!("{} is outside 0-100", self.audio.initial_volume),
            });
        }
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Cadenza\config`
/// On macOS: `~/Library/Application Support/app.cadenza.Cadenza`
/// On Linux: `~/.config/cadenza`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("app", "cadenza", "Cadenza")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of the default `config.toml`, if a config directory exists.
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Reads and validates a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or
/// holds out-of-range values.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration from disk.
///
/// Reads `path` if given, otherwise `config.toml` from the platform's
/// configuration directory. Returns defaults if the file doesn't exist;
/// an unreadable or invalid file is logged and also yields defaults.
pub fn load(path: Option<&Path>) -> Config {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_path) else {
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
            Config::default()
        }
    }
}
