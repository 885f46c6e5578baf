//! Talkback - voice-interaction pipeline
//!
//! Capture an utterance, transcribe it, obtain a conversational reply, and
//! optionally synthesize the reply back to speech. The crate owns the WAV
//! codec, the three network clients, and the session state machine; audio
//! hardware and presentation stay with the host, which receives every state
//! transition over an event channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       Host                           │
//! │   capture  │  indicators  │  playback device         │
//! └──────┬────────────▲─────────────────▲────────────────┘
//!        │ samples    │ events          │ AudioSink
//! ┌──────▼────────────┴─────────────────┴────────────────┐
//! │                 Pipeline controller                   │
//! │  Idle → Recording → AwaitingTranscription →          │
//! │  AwaitingReply → [AwaitingSpeech → Playing] → Idle   │
//! └──────┬───────────────┬───────────────┬───────────────┘
//!        │ WAV           │ text          │ text
//! ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//! │ Transcriber │ │ChatCompleter│ │ Synthesizer │
//! └─────────────┘ └─────────────┘ └─────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod voice;

pub use audio::{AudioBuffer, AudioSink, wav};
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineEvent, PipelineState};
pub use voice::{ChatClient, ChatCompleter, SpeechClient, SpeechSynthesizer, Transcriber, WhisperClient};
