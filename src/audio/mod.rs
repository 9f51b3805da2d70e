//! Audio path: microphone capture, PCM16 codec, input metering, and
//! scheduled playback of synthesized speech.

pub mod capture;
pub mod codec;
pub mod meter;
pub mod playback;
pub mod recorder;

pub use capture::{AudioFrame, CaptureBackend, CaptureConfig, CpalBackend};
pub use codec::{decode_chunk, encode_frame, pcm_mime_type, DecodeError, EncodedPayload};
pub use meter::input_level;
pub use playback::{AudioSink, PlaybackScheduler, PlaybackUnit, RodioSink};
pub use recorder::CaptureDump;
