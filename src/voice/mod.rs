//! Network clients for the three pipeline services
//!
//! Each stage sits behind a trait so the pipeline controller (and tests) can
//! substitute backends. The shipped implementations speak the OpenAI wire
//! formats: multipart transcription, JSON chat completions, and binary-WAV
//! speech synthesis.

mod chat;
mod stt;
mod tts;

pub use chat::ChatClient;
pub use stt::WhisperClient;
pub use tts::SpeechClient;

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV byte buffer to text
    ///
    /// # Errors
    ///
    /// Returns error if the request or response handling fails
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String>;
}

/// Chat-completion backend
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Obtain the assistant's reply to a user message
    ///
    /// # Errors
    ///
    /// Returns error if the request or response handling fails
    async fn complete(&self, text: &str) -> Result<String>;
}

/// Text-to-speech backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text into a WAV byte buffer
    ///
    /// # Errors
    ///
    /// Returns error if the request or response handling fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Build an HTTP client with the per-request timeout applied
fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(e.to_string()))
}

/// Turn a non-success response into a protocol error carrying the server's
/// error detail; the body is never parsed as a stage result.
async fn protocol_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let detail = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, detail = %detail, "API error");
    Error::Protocol {
        status: status.as_u16(),
        detail,
    }
}
