//! Configuration management for the drill pipeline

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::scoring::DEFAULT_THRESHOLD;
use crate::{Error, Result};

use file::DrillConfigFile;

/// Default SpeechKit synthesis endpoint
pub const DEFAULT_TTS_URL: &str = "https://tts.api.cloud.yandex.net/speech/v1/tts:synthesize";

/// Default SpeechKit recognition endpoint
pub const DEFAULT_STT_URL: &str = "https://stt.api.cloud.yandex.net/speech/v1/stt:recognize";

/// Synthesis formats the noise injector can decode
pub const SUPPORTED_TTS_FORMATS: &[&str] = &["mp3"];

/// Drill configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database, audio artifacts)
    pub data_dir: PathBuf,

    /// Speech service configuration
    pub speech: SpeechConfig,

    /// Similarity an answer must exceed to count as correct
    pub threshold: f64,
}

/// Speech service configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// API key for both endpoints
    pub api_key: SecretString,

    /// Synthesis endpoint
    pub tts_url: String,

    /// Recognition endpoint
    pub stt_url: String,

    /// Synthesis language
    pub language: String,

    /// Recognition language
    pub stt_language: String,

    /// Synthesis audio format
    pub tts_format: String,

    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            tts_url: DEFAULT_TTS_URL.to_string(),
            stt_url: DEFAULT_STT_URL.to_string(),
            language: "en-US".to_string(),
            stt_language: "en-US".to_string(),
            tts_format: "mp3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        let config = Self::resolve(fc, |key| std::env::var(key).ok())?;

        std::fs::create_dir_all(config.audio_dir())?;
        Ok(config)
    }

    /// Merge a config file with variables looked up through `env`
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range
    pub fn resolve(fc: DrillConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SpeechConfig::default();

        let timeout_secs = match env("SPEECH_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config(format!("SPEECH_TIMEOUT_SECS is not a number: {v}")))?,
            None => fc
                .speech
                .timeout_secs
                .unwrap_or(defaults.timeout.as_secs()),
        };

        let speech = SpeechConfig {
            api_key: SecretString::from(
                env("SPEECH_API_KEY")
                    .or(fc.speech.api_key)
                    .unwrap_or_default(),
            ),
            tts_url: env("SPEECH_TTS_URL")
                .or(fc.speech.tts_url)
                .unwrap_or(defaults.tts_url),
            stt_url: env("SPEECH_STT_URL")
                .or(fc.speech.stt_url)
                .unwrap_or(defaults.stt_url),
            language: env("SPEECH_LANGUAGE")
                .or(fc.speech.language)
                .unwrap_or(defaults.language),
            stt_language: env("SPEECH_STT_LANGUAGE")
                .or(fc.speech.stt_language)
                .unwrap_or(defaults.stt_language),
            tts_format: env("SPEECH_TTS_FORMAT")
                .or(fc.speech.tts_format)
                .unwrap_or(defaults.tts_format),
            timeout: Duration::from_secs(timeout_secs),
        };

        if !SUPPORTED_TTS_FORMATS.contains(&speech.tts_format.as_str()) {
            return Err(Error::Config(format!(
                "unsupported TTS format {:?}, expected one of {SUPPORTED_TTS_FORMATS:?}",
                speech.tts_format
            )));
        }

        let threshold = match env("DRILL_THRESHOLD") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config(format!("DRILL_THRESHOLD is not a number: {v}")))?,
            None => fc.scoring.threshold.unwrap_or(DEFAULT_THRESHOLD),
        };
        if !(0.0..1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "scoring threshold must be in [0, 1), got {threshold}"
            )));
        }

        // ~/.local/share/speech-drill on Linux
        let data_dir = env("DRILL_DATA_DIR")
            .or(fc.storage.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                directories::ProjectDirs::from("dev", "speech-drill", "speech-drill")
                    .map_or_else(|| PathBuf::from(".speech-drill"), |d| d.data_dir().to_path_buf())
            });

        Ok(Self {
            data_dir,
            speech,
            threshold,
        })
    }

    /// Database file path
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("drill.db")
    }

    /// Directory for synthesized and recorded audio
    #[must_use]
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::config::file::{ScoringFileConfig, SpeechFileConfig, StorageFileConfig};

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(DrillConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.speech.tts_url, DEFAULT_TTS_URL);
        assert_eq!(config.speech.stt_url, DEFAULT_STT_URL);
        assert_eq!(config.speech.tts_format, "mp3");
        assert_eq!(config.speech.timeout, Duration::from_secs(30));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert!(config.speech.api_key.expose_secret().is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = DrillConfigFile {
            speech: SpeechFileConfig {
                api_key: Some("from-file".to_string()),
                language: Some("en-GB".to_string()),
                ..SpeechFileConfig::default()
            },
            storage: StorageFileConfig {
                data_dir: Some("/srv/drill".to_string()),
            },
            scoring: ScoringFileConfig {
                threshold: Some(0.3),
            },
        };

        let config = Config::resolve(
            fc,
            env_from(&[("SPEECH_API_KEY", "from-env"), ("SPEECH_TIMEOUT_SECS", "5")]),
        )
        .unwrap();

        assert_eq!(config.speech.api_key.expose_secret(), "from-env");
        assert_eq!(config.speech.language, "en-GB");
        assert_eq!(config.speech.timeout, Duration::from_secs(5));
        assert_eq!(config.threshold, 0.3);
        assert_eq!(config.db_path(), PathBuf::from("/srv/drill/drill.db"));
        assert_eq!(config.audio_dir(), PathBuf::from("/srv/drill/audio"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = Config::resolve(
            DrillConfigFile::default(),
            env_from(&[("DRILL_THRESHOLD", "1.5")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::resolve(
            DrillConfigFile::default(),
            env_from(&[("SPEECH_TIMEOUT_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        for format in ["oggopus", "lpcm"] {
            let err = Config::resolve(
                DrillConfigFile::default(),
                env_from(&[("SPEECH_TTS_FORMAT", format)]),
            )
            .unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains(format)));
        }

        let fc = DrillConfigFile {
            speech: SpeechFileConfig {
                tts_format: Some("oggopus".to_string()),
                ..SpeechFileConfig::default()
            },
            ..DrillConfigFile::default()
        };
        assert!(matches!(
            Config::resolve(fc, env_from(&[])).unwrap_err(),
            Error::Config(_)
        ));
    }
}
