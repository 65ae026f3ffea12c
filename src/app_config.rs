use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Fixed language code applied to every ingested document,
    /// instead of per-document detection
    #[serde(default)]
    pub language: Option<String>,

    /// Database file location, defaulting to the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Speech backend config
    #[serde(default)]
    pub backend: BackendSettings,

    /// Narration behavior config
    #[serde(default)]
    pub narration: NarrationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech backend type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: Local synthesizer and player subprocesses
    #[default]
    Process,
    // @backend: HTTP bridge to a host application's speech engine
    Bridge,
}

impl BackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Process => "Process",
            Self::Bridge => "Bridge",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Process => "process".to_string(),
            Self::Bridge => "bridge".to_string(),
        }
    }
}

// Implement Display trait for BackendKind
impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for BackendKind
impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "bridge" => Ok(Self::Bridge),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// Speech backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendSettings {
    // @field: Backend type identifier
    #[serde(default, rename = "type")]
    pub kind: BackendKind,

    // @field: Synthesizer executable for the process backend
    #[serde(default = "default_synthesizer_command")]
    pub synthesizer_command: String,

    // @field: Audio player executable for the process backend
    #[serde(default = "default_player_command")]
    pub player_command: String,

    // @field: Directory holding voice models for the process backend
    #[serde(default = "default_voices_dir")]
    pub voices_dir: Option<PathBuf>,

    // @field: Endpoint of the speech bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: Option<String>,

    // @field: Timeout seconds for bridge requests
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            synthesizer_command: default_synthesizer_command(),
            player_command: default_player_command(),
            voices_dir: default_voices_dir(),
            bridge_url: default_bridge_url(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

/// Narration behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NarrationConfig {
    /// Silence between sentences in milliseconds
    #[serde(default = "default_sentence_gap_ms")]
    pub sentence_gap_ms: u64,

    /// Speech rate multiplier (1.0 = normal speed)
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            sentence_gap_ms: default_sentence_gap_ms(),
            speech_rate: default_speech_rate(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_synthesizer_command() -> String {
    "piper".to_string()
}

fn default_player_command() -> String {
    "aplay".to_string()
}

fn default_voices_dir() -> Option<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .map(|base| base.join("lectern").join("voices"))
}

fn default_bridge_url() -> Option<String> {
    Some("http://127.0.0.1:5175".to_string())
}

fn default_backend_timeout_secs() -> u64 {
    120
}

fn default_sentence_gap_ms() -> u64 {
    300
}

fn default_speech_rate() -> f32 {
    1.0
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate the language override, when set
        if let Some(language) = &self.language {
            let _language_name = crate::language_utils::get_language_name(language)?;
        }

        // Validate the settings the selected backend depends on
        match self.backend.kind {
            BackendKind::Process => {
                if self.backend.synthesizer_command.is_empty() {
                    return Err(anyhow!("A synthesizer command is required for the process backend"));
                }
                if self.backend.player_command.is_empty() {
                    return Err(anyhow!("A player command is required for the process backend"));
                }
                if self.backend.voices_dir.is_none() {
                    return Err(anyhow!("A voices directory is required for the process backend"));
                }
            },
            BackendKind::Bridge => {
                if self.backend.bridge_url.as_deref().unwrap_or("").is_empty() {
                    return Err(anyhow!("A bridge URL is required for the bridge backend"));
                }
            },
        }

        if self.narration.speech_rate <= 0.0 {
            return Err(anyhow!("Speech rate must be positive, got {}", self.narration.speech_rate));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: None,
            database_path: None,
            backend: BackendSettings::default(),
            narration: NarrationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
