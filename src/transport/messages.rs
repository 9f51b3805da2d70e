//! Wire format of the duplex channel.
//!
//! Outbound: one JSON message per captured frame carrying base64 PCM16 and
//! its mimetype. Inbound: server messages whose `serverContent` mixes audio
//! parts, transcription fragments, and turn/interruption flags, flattened
//! here into `ServerEvent`s.

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ServerEvent, SessionDirectives};
use crate::audio::EncodedPayload;

/// The only response modality this client asks for.
const AUDIO_MODALITY: &str = "AUDIO";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub mime_type: String,
    /// Base64 PCM16LE mono
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media: MediaBlob,
}

/// One captured frame, framed for the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMessage {
    pub realtime_input: RealtimeInput,
}

impl AudioMessage {
    pub fn from_payload(payload: &EncodedPayload) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media: MediaBlob {
                    mime_type: payload.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&payload.data),
                },
            },
        }
    }
}

/// First message on a fresh channel: instructions, voice, and the
/// determinism knobs pinned for a live audio session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub system_instruction: String,
    pub generation_config: GenerationConfig,
    pub speech_config: SpeechConfig,
    pub input_audio_transcription: Empty,
    pub output_audio_transcription: Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

impl SetupMessage {
    pub fn from_directives(directives: &SessionDirectives) -> Self {
        Self {
            setup: Setup {
                system_instruction: directives.system_instruction.clone(),
                generation_config: GenerationConfig {
                    temperature: directives.temperature,
                    response_modalities: vec![AUDIO_MODALITY.to_string()],
                    thinking_config: directives
                        .disable_thinking
                        .then_some(ThinkingConfig { thinking_budget: 0 }),
                },
                speech_config: SpeechConfig {
                    voice_name: directives.voice.clone(),
                },
                input_audio_transcription: Empty {},
                output_audio_transcription: Empty {},
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub interrupted: Option<bool>,
    pub turn_complete: Option<bool>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

impl ServerMessage {
    /// Flatten one wire message into core events, in the order the session
    /// consumes them. An interruption preempts everything else the message
    /// might carry.
    pub fn into_events(self) -> Vec<ServerEvent> {
        let Some(content) = self.server_content else {
            return Vec::new();
        };

        if content.interrupted.unwrap_or(false) {
            return vec![ServerEvent::Interrupted];
        }

        let mut events = Vec::new();

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                        Ok(bytes) => events.push(ServerEvent::AudioChunk(bytes)),
                        Err(e) => warn!("Discarding audio part with invalid base64: {e}"),
                    }
                }
            }
        }

        if let Some(text) = content.input_transcription.and_then(|t| t.text) {
            if !text.is_empty() {
                events.push(ServerEvent::InputTranscriptDelta(text));
            }
        }

        if let Some(text) = content.output_transcription.and_then(|t| t.text) {
            if !text.is_empty() {
                events.push(ServerEvent::OutputTranscriptDelta(text));
            }
        }

        if content.turn_complete.unwrap_or(false) {
            events.push(ServerEvent::TurnComplete);
        }

        events
    }
}
