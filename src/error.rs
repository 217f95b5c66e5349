//! Error types for the drill pipeline

use thiserror::Error;

/// Result type alias for drill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing practice audio or evaluating answers
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected input (e.g. negative noise intensity)
    #[error("invalid input: {0}")]
    Validation(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Text-to-speech service error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech-to-text service error
    #[error("STT error: {0}")]
    Stt(String),

    /// Audio artifact could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Audio artifact could not be encoded or written
    #[error("encode error: {0}")]
    Encode(String),

    /// Phrase-stream was already evaluated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request exceeded its time budget
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Synthesis path failed: no practice audio was produced
    #[error("could not produce practice audio: {0}")]
    Practice(Box<Error>),

    /// Evaluation path failed: the answer was not recorded
    #[error("could not evaluate answer: {0}")]
    Evaluation(Box<Error>),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Wrap as a synthesis-path failure
    #[must_use]
    pub fn practice(self) -> Self {
        if matches!(self, Self::Practice(_)) {
            self
        } else {
            Self::Practice(Box::new(self))
        }
    }

    /// Wrap as an evaluation-path failure
    #[must_use]
    pub fn evaluation(self) -> Self {
        if matches!(self, Self::Evaluation(_)) {
            self
        } else {
            Self::Evaluation(Box::new(self))
        }
    }

    /// The underlying cause, with the pipeline stage wrapper removed
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Practice(inner) | Self::Evaluation(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether re-issuing the same request may succeed
    ///
    /// External service, network, timeout and IO failures are transient, as is
    /// a busy or locked database.
    /// Lookups, conflicts and malformed input will fail the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Self::Tts(_)
            | Self::Stt(_)
            | Self::Http(_)
            | Self::Timeout(_)
            | Self::Io(_)
            | Self::Database(_) => true,
            // Lock contention outlasting the busy timeout
            Self::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}
