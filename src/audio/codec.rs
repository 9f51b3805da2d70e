//! PCM16 codec between normalized float frames and transport payloads.
//!
//! Both directions are pure transforms. Encoding cannot fail: out-of-range
//! samples are clamped and NaN flattens to silence. Decoding fails only when
//! a payload is not a whole number of 16-bit samples.

use thiserror::Error;

/// Width of one encoded sample in bytes.
pub const BYTES_PER_SAMPLE: usize = 2;

/// An encoded audio frame ready for the transport, tagged with the
/// mimetype describing its rate and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Mimetype tag for little-endian PCM16 at the given rate.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Clamp a normalized sample to [-1, 1] and scale it to the signed 16-bit
/// range. Negative samples scale by 0x8000 and positive ones by 0x7FFF so
/// both endpoints are representable.
fn quantize(sample: f32) -> i16 {
    let s = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    if s < 0.0 {
        (s * 0x8000 as f32) as i16
    } else {
        (s * 0x7FFF as f32) as i16
    }
}

/// Encode one captured frame as little-endian PCM16 bytes.
pub fn encode_frame(samples: &[f32], sample_rate: u32) -> EncodedPayload {
    let mut data = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        data.extend_from_slice(&quantize(sample).to_le_bytes());
    }
    EncodedPayload {
        mime_type: pcm_mime_type(sample_rate),
        data,
    }
}

/// A payload whose length is not a multiple of the sample width. The
/// offending chunk is dropped by the caller; the session continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Payload of {0} bytes is not a whole number of 16-bit samples")]
pub struct DecodeError(pub usize);

/// Decode little-endian PCM16 bytes back to a normalized float buffer.
pub fn decode_chunk(data: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if data.len() % BYTES_PER_SAMPLE != 0 {
        return Err(DecodeError(data.len()));
    }
    Ok(data
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}
