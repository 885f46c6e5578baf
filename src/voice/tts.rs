//! Text-to-speech client

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SynthesisConfig;
use crate::voice::{SpeechSynthesizer, http_client, protocol_error};
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Synthesizes speech via an OpenAI-compatible speech endpoint
///
/// The response body is raw WAV bytes, returned verbatim for the decoder.
pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
}

impl SpeechClient {
    /// Create a new speech-synthesis client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &SynthesisConfig, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "API key required for speech synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: http_client(timeout)?,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            voice: config.voice.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(model = %self.model, voice = %self.voice, "starting synthesis");

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis request failed");
                Error::from_transport(&e)
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            return Err(protocol_error(response).await);
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(&e))?;

        tracing::info!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format() {
        let request = SpeechRequest {
            model: "tts-1",
            input: "hi there",
            voice: "alloy",
            response_format: "wav",
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "tts-1",
                "input": "hi there",
                "voice": "alloy",
                "response_format": "wav",
            })
        );
    }
}
