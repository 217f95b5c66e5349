//! Speech-to-text (STT) client

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::SpeechToText;
use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Response from the recognition endpoint
#[derive(serde::Deserialize)]
struct RecognizeResponse {
    result: String,
}

/// Transcribes speech through the cloud STT endpoint
pub struct CloudStt {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
    language: String,
}

impl CloudStt {
    /// Create a new STT client from speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("speech API key required for STT".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.stt_url.clone(),
            language: config.stt_language.clone(),
        })
    }
}

#[async_trait]
impl SpeechToText for CloudStt {
    async fn recognize(&self, audio: &Path) -> Result<String> {
        let data = tokio::fs::read(audio).await?;
        tracing::debug!(audio_bytes = data.len(), "starting transcription");

        let response = self
            .client
            .post(&self.url)
            .query(&[("lang", self.language.as_str())])
            .header(
                "Authorization",
                format!("Api-Key {}", self.api_key.expose_secret()),
            )
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "STT request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "STT API error");
            return Err(Error::Stt(format!("STT API error {status}: {body}")));
        }

        let result: RecognizeResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::Stt(format!("malformed STT response: {e}"))
        })?;

        tracing::info!(transcript = %result.result, "transcription complete");
        Ok(result.result)
    }

    fn name(&self) -> &'static str {
        "cloud-stt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = SpeechConfig {
            api_key: SecretString::from(String::new()),
            ..SpeechConfig::default()
        };
        assert!(matches!(CloudStt::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_response() {
        let parsed: RecognizeResponse =
            serde_json::from_str(r#"{"result": "the cat sat"}"#).unwrap();
        assert_eq!(parsed.result, "the cat sat");
    }
}
