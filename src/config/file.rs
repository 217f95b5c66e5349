//! TOML configuration file loading
//!
//! Supports `~/.config/speech-drill/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DrillConfigFile {
    /// Speech service configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Storage locations
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Answer scoring
    #[serde(default)]
    pub scoring: ScoringFileConfig,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// API key sent as `Authorization: Api-Key <key>`
    pub api_key: Option<String>,

    /// Synthesis endpoint
    pub tts_url: Option<String>,

    /// Recognition endpoint
    pub stt_url: Option<String>,

    /// Synthesis language (e.g. "en-US")
    pub language: Option<String>,

    /// Recognition language
    pub stt_language: Option<String>,

    /// Synthesis audio format (e.g. "mp3")
    pub tts_format: Option<String>,

    /// Per-request HTTP timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Data directory holding the database and audio artifacts
    pub data_dir: Option<String>,
}

/// Scoring configuration
#[derive(Debug, Default, Deserialize)]
pub struct ScoringFileConfig {
    /// Similarity an answer must exceed to count as correct
    pub threshold: Option<f64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `DrillConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> DrillConfigFile {
    let Some(path) = config_file_path() else {
        return DrillConfigFile::default();
    };

    if !path.exists() {
        return DrillConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                DrillConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            DrillConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/speech-drill/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("speech-drill").join("config.toml"))
}
