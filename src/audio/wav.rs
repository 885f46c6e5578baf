//! PCM WAV container codec
//!
//! Writes the canonical 44-byte-header layout the transcription API expects
//! and reads back the narrow WAV dialect the speech-synthesis API returns:
//! RIFF/WAVE, chunk-scanned in any order, fmt required before data, 16- or
//! 32-bit integer PCM. Trailing chunks after the first data chunk are
//! ignored; this is a supported subset, not general WAV compliance.

use crate::audio::AudioBuffer;
use crate::{Error, Result};

/// Size of the canonical RIFF + fmt + data header
pub const HEADER_LEN: usize = 44;

/// Format parameters discovered from a WAV container's fmt chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample
    pub bits_per_sample: u16,
}

/// Encode interleaved samples into a canonical PCM WAV byte buffer
///
/// Only 16-bit output is supported. Each sample is mapped to `i16` via
/// `f * 32767.0`; inputs outside `[-1.0, 1.0]` saturate at the integer
/// bounds. No resampling is performed.
///
/// # Errors
///
/// Returns [`Error::UnsupportedBitDepth`] for any depth other than 16.
pub fn encode(buffer: &AudioBuffer, bits_per_sample: u16) -> Result<Vec<u8>> {
    if bits_per_sample != 16 {
        return Err(Error::UnsupportedBitDepth(bits_per_sample));
    }

    let bytes_per_sample = u32::from(bits_per_sample) / 8;
    let data_len = buffer.samples.len() as u32 * bytes_per_sample;
    let byte_rate = buffer.sample_rate * u32::from(buffer.channels) * bytes_per_sample;
    let block_align = buffer.channels * bits_per_sample / 8;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&buffer.channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &buffer.samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample * 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }

    Ok(out)
}

/// Decode a WAV byte buffer into its format parameters and samples
///
/// Samples stay interleaved in the source channel order; no de-interleaving
/// or resampling is performed.
///
/// # Errors
///
/// Returns [`Error::MalformedContainer`] for a missing RIFF/WAVE signature
/// or a truncated chunk, [`Error::OutOfOrderChunks`] when a data chunk
/// precedes the fmt chunk, [`Error::MissingDataChunk`] when the buffer ends
/// without one, and [`Error::UnsupportedBitDepth`] for sample depths other
/// than 16 or 32.
pub fn decode(bytes: &[u8]) -> Result<(WavFormat, AudioBuffer)> {
    let mut reader = ChunkReader::new(bytes);

    if reader.take(4)? != b"RIFF" {
        return Err(Error::MalformedContainer("missing RIFF signature".into()));
    }
    // Declared RIFF size is not validated against the actual buffer length.
    reader.skip(4);
    if reader.take(4)? != b"WAVE" {
        return Err(Error::MalformedContainer("missing WAVE signature".into()));
    }

    let mut format: Option<WavFormat> = None;
    let mut data: Option<&[u8]> = None;

    while reader.remaining() >= 8 {
        let id: [u8; 4] = reader.take(4)?.try_into().unwrap_or_default();
        let declared = u32::from_le_bytes(reader.take(4)?.try_into().unwrap_or_default());

        // 0xFFFFFFFF marks a streaming chunk extending to end of buffer.
        let size = if declared == u32::MAX {
            reader.remaining()
        } else {
            declared as usize
        };

        match &id {
            b"fmt " => {
                let payload = reader.take(size)?;
                if payload.len() < 16 {
                    return Err(Error::MalformedContainer("fmt chunk too short".into()));
                }
                format = Some(WavFormat {
                    channels: u16::from_le_bytes([payload[2], payload[3]]),
                    sample_rate: u32::from_le_bytes([
                        payload[4], payload[5], payload[6], payload[7],
                    ]),
                    bits_per_sample: u16::from_le_bytes([payload[14], payload[15]]),
                });
                tracing::debug!(format = ?format, "parsed fmt chunk");
            }
            b"data" => {
                if format.is_none() {
                    return Err(Error::OutOfOrderChunks);
                }
                let payload = reader.take(size)?;
                tracing::debug!(bytes = payload.len(), "found data chunk");
                data = Some(payload);
                // Anything after the first data chunk is ignored.
                break;
            }
            _ => {
                reader.skip(size);
            }
        }
    }

    let format = format.ok_or(Error::MissingDataChunk)?;
    let payload = data.ok_or(Error::MissingDataChunk)?;
    let samples = samples_from_bytes(payload, format.bits_per_sample)?;

    let buffer = AudioBuffer::new(samples, format.channels, format.sample_rate);
    Ok((format, buffer))
}

/// Convert raw little-endian PCM bytes into normalized samples
fn samples_from_bytes(data: &[u8], bits_per_sample: u16) -> Result<Vec<f32>> {
    match bits_per_sample {
        16 => Ok(data
            .chunks_exact(2)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / f32::from(i16::MAX))
            .collect()),
        #[allow(clippy::cast_precision_loss)]
        32 => Ok(data
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / i32::MAX as f32)
            .collect()),
        other => Err(Error::UnsupportedBitDepth(other)),
    }
}

/// Bounds-checked cursor over the container bytes
struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::MalformedContainer(format!(
                "truncated at offset {}: wanted {len} bytes, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Advance without reading; clamped to the end of the buffer, matching
    /// a seek past the end of a stream.
    fn skip(&mut self, len: usize) {
        self.pos = self.pos.saturating_add(len).min(self.bytes.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (i as f32 * 0.05).sin() * 0.8)
            .collect();
        AudioBuffer::new(samples, 1, 44_100)
    }

    #[test]
    fn header_layout() {
        let wav = encode(&tone(10), 16).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes(wav[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(wav[20..22].try_into().unwrap()), 1);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 20);
        assert_eq!(wav.len(), HEADER_LEN + 20);
    }

    #[test]
    fn byte_rate_and_block_align() {
        let buf = AudioBuffer::new(vec![0.0; 8], 2, 22_050);
        let wav = encode(&buf, 16).unwrap();
        let byte_rate = u32::from_le_bytes(wav[28..32].try_into().unwrap());
        let block_align = u16::from_le_bytes(wav[32..34].try_into().unwrap());
        assert_eq!(byte_rate, 22_050 * 2 * 2);
        assert_eq!(block_align, 4);
    }

    #[test]
    fn only_16_bit_output() {
        let err = encode(&tone(4), 24).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBitDepth(24)));
    }

    #[test]
    fn out_of_range_input_saturates() {
        let buf = AudioBuffer::new(vec![2.0, -2.0], 1, 8_000);
        let wav = encode(&buf, 16).unwrap();
        let first = i16::from_le_bytes(wav[44..46].try_into().unwrap());
        let second = i16::from_le_bytes(wav[46..48].try_into().unwrap());
        assert_eq!(first, i16::MAX);
        assert_eq!(second, i16::MIN);
    }

    #[test]
    fn round_trip_preserves_samples() {
        let original = tone(500);
        let wav = encode(&original, 16).unwrap();
        let (format, decoded) = decode(&wav).unwrap();

        assert_eq!(format.channels, 1);
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(decoded.samples.len(), original.samples.len());
        for (a, b) in decoded.samples.iter().zip(&original.samples) {
            assert!((a - b).abs() <= 1.0 / 32767.0, "{a} vs {b}");
        }
    }

    #[test]
    fn streaming_size_marker_reads_to_end() {
        let mut wav = encode(&tone(16), 16).unwrap();
        wav[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        let (_, decoded) = decode(&wav).unwrap();
        assert_eq!(decoded.samples.len(), 16);
    }

    #[test]
    fn thirty_two_bit_samples() {
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&44u32.to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&48_000u32.to_le_bytes());
        wav.extend_from_slice(&(48_000u32 * 4).to_le_bytes());
        wav.extend_from_slice(&4u16.to_le_bytes());
        wav.extend_from_slice(&32u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&8u32.to_le_bytes());
        wav.extend_from_slice(&i32::MAX.to_le_bytes());
        wav.extend_from_slice(&(i32::MIN / 2).to_le_bytes());

        let (format, decoded) = decode(&wav).unwrap();
        assert_eq!(format.bits_per_sample, 32);
        assert!((decoded.samples[0] - 1.0).abs() < 1e-6);
        assert!((decoded.samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn truncated_data_chunk_is_malformed() {
        let mut wav = encode(&tone(16), 16).unwrap();
        wav.truncate(wav.len() - 4);
        assert!(matches!(decode(&wav), Err(Error::MalformedContainer(_))));
    }
}
