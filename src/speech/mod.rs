//! Speech service ports
//!
//! The pipeline only depends on the two traits below. `CloudTts` and
//! `CloudStt` implement them against the SpeechKit-style REST API; tests
//! substitute local doubles.

mod stt;
mod tts;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

pub use stt::CloudStt;
pub use tts::CloudTts;

/// Renders text into an audio file
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` with the given accent/voice selector into `output`
    ///
    /// # Errors
    ///
    /// Returns error if the service call fails or the file cannot be written
    async fn synthesize(&self, text: &str, output: &Path, accent: &str) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Transcribes a recorded audio file
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe the audio file at `audio`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the service call fails
    async fn recognize(&self, audio: &Path) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
