//! Configuration for the talkback pipeline
//!
//! Endpoints, model identifiers, voice selection, and the credential are
//! static configuration supplied by the host; nothing is negotiated at
//! runtime. Values load from a TOML file with per-field defaults, and the
//! credential falls back to the `OPENAI_API_KEY` environment variable.

use std::path::Path;

use serde::Deserialize;

use crate::Result;

/// Environment variable consulted when no `api_key` is configured
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Talkback pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bearer credential shared by the transcription/chat/synthesis services
    pub api_key: Option<String>,

    /// Per-request timeout in seconds; expiry surfaces as a connection error
    pub request_timeout_secs: u64,

    /// Speech-to-text stage
    pub transcription: TranscriptionConfig,

    /// Chat-completion stage
    pub chat: ChatConfig,

    /// Text-to-speech stage; omit the table to run the chat-only pipeline
    pub synthesis: Option<SynthesisConfig>,

    /// Advisory capture parameters for the host recording layer
    pub recording: RecordingConfig,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Transcription endpoint URL
    pub endpoint: String,

    /// Transcription model identifier
    pub model: String,

    /// ISO 639-1 language hint sent with each request
    pub language: String,
}

/// Chat-completion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Chat endpoint URL; point at a local OpenAI-compatible server to run
    /// without the cloud provider
    pub endpoint: String,

    /// Chat model identifier
    pub model: String,

    /// Attach the bearer credential; local servers typically require none
    pub use_auth: bool,
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Synthesis endpoint URL
    pub endpoint: String,

    /// Synthesis model identifier
    pub model: String,

    /// Voice identifier
    pub voice: String,
}

/// Advisory capture parameters for the host recording layer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Maximum capture duration in seconds
    pub max_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            request_timeout_secs: 30,
            transcription: TranscriptionConfig::default(),
            chat: ChatConfig::default(),
            synthesis: None,
            recording: RecordingConfig::default(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            language: "en".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            use_auth: true,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            max_seconds: 10,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields take their defaults; a missing `api_key` falls back to
    /// the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&text)?;
        if config.api_key.is_none() {
            config.api_key = std::env::var(API_KEY_ENV).ok();
        }
        Ok(config)
    }
}
