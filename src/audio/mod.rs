//! Audio buffers and the playback seam
//!
//! The pipeline never touches audio hardware. Captured samples arrive as an
//! [`AudioBuffer`] and synthesized audio leaves through an [`AudioSink`]
//! supplied by the host.

pub mod wav;

use async_trait::async_trait;

use crate::Result;

/// Interleaved normalized PCM samples with their format parameters
///
/// Samples are `f32` in approximately `[-1.0, 1.0]`, interleaved by channel.
/// Each buffer is owned by exactly one pipeline stage at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples
    pub samples: Vec<f32>,
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples
    ///
    /// The caller must guarantee `samples.len()` is a multiple of `channels`.
    #[must_use]
    pub const fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of sample frames (samples per channel)
    #[must_use]
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frame_count() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Destination for decoded reply audio
///
/// `play` resolves once playback has completed, so the pipeline can hold the
/// `Playing` state for exactly as long as the host is emitting sound.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play a buffer to completion
    ///
    /// # Errors
    ///
    /// Returns error if the host playback device fails
    async fn play(&self, audio: AudioBuffer) -> Result<()>;
}
