//! Text-to-speech (TTS) client

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::TextToSpeech;
use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Synthesizes speech through the cloud TTS endpoint
pub struct CloudTts {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
    language: String,
    format: String,
}

impl CloudTts {
    /// Create a new TTS client from speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("speech API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.tts_url.clone(),
            language: config.language.clone(),
            format: config.tts_format.clone(),
        })
    }
}

#[async_trait]
impl TextToSpeech for CloudTts {
    async fn synthesize(&self, text: &str, output: &Path, accent: &str) -> Result<()> {
        tracing::debug!(chars = text.len(), accent, "starting synthesis");

        let mut form = vec![
            ("text", text),
            ("lang", self.language.as_str()),
            ("format", self.format.as_str()),
        ];
        if !accent.is_empty() {
            form.push(("voice", accent));
        }

        let response = self
            .client
            .post(&self.url)
            .header(
                "Authorization",
                format!("Api-Key {}", self.api_key.expose_secret()),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "TTS request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tokio::fs::write(output, &audio).await?;

        tracing::info!(
            bytes = audio.len(),
            output = %output.display(),
            "synthesis complete"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cloud-tts"
    }
}
