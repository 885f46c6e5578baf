//! Error types for the talkback pipeline

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Result type alias for talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the talkback pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Byte buffer is not a RIFF/WAVE container
    #[error("malformed WAV container: {0}")]
    MalformedContainer(String),

    /// A data chunk appeared before any fmt chunk
    #[error("fmt chunk must appear before data chunk")]
    OutOfOrderChunks,

    /// The container ended without a data chunk
    #[error("no data chunk found in WAV container")]
    MissingDataChunk,

    /// Sample depth the codec does not handle
    #[error("unsupported bits per sample: {0}")]
    UnsupportedBitDepth(u16),

    /// Transport-level failure: no response was received
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status
    #[error("protocol error: HTTP {status}: {detail}")]
    Protocol {
        /// HTTP status code
        status: u16,
        /// Server-provided error detail
        detail: String,
    },

    /// A 2xx response whose body does not match the expected schema
    #[error("response parse error: {0}")]
    ResponseParse(String),

    /// Session re-entry while a prior run is in flight
    #[error("pipeline busy in state {0:?}")]
    Busy(PipelineState),

    /// The in-flight run was aborted by the caller
    #[error("pipeline aborted")]
    Aborted,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Classify a `reqwest` transport or body error.
    ///
    /// Errors raised before a response arrives (connect failures, timeouts,
    /// request construction) become [`Error::Connection`]; errors decoding a
    /// successful response become [`Error::ResponseParse`].
    pub(crate) fn from_transport(e: &reqwest::Error) -> Self {
        if e.is_decode() {
            Self::ResponseParse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}
