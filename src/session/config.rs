use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed delimiter between the system instruction and the knowledge blob.
pub const CONTEXT_DELIMITER: &str = "\n\n[REFERENCE NOTES]:\n";

/// Instruction used when the configuration does not provide one.
pub const DEFAULT_INSTRUCTION: &str = "You are a discreet live assistant monitoring a conversation. \
Answer direct factual questions in as few words as possible. \
Stay silent for greetings, small talk, and statements that ask nothing.";

/// What the playback side does when the service reports the agent was
/// interrupted mid-utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterruptPolicy {
    /// Stop every active unit immediately and reset the timeline
    #[default]
    Hard,
    /// Let already-scheduled units play to completion
    Soft,
}

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Microphone sample rate sent upstream
    pub input_sample_rate: u32,

    /// Sample rate of the synthesized audio received downstream
    pub output_sample_rate: u32,

    /// Samples per captured frame (256 at 16kHz is ~16ms)
    pub frame_samples: usize,

    /// Synthesized voice requested from the service
    pub voice: String,

    /// System instruction; the knowledge blob is folded in at connect time
    pub system_instruction: String,

    /// Pinned at zero for deterministic responses
    pub temperature: f32,

    /// Playback behavior on an interruption signal
    pub interrupt_policy: InterruptPolicy,

    /// Guard interval keeping a unit from being scheduled in the past
    pub lead_in: Duration,

    /// Idle delay before the playback cursor resets
    pub grace: Duration,

    /// How often the summarizer is polled
    pub summary_interval: Duration,

    /// Minimum transcript entries before a summary is requested
    pub summary_min_entries: usize,

    /// Optional WAV file the captured audio is appended to
    pub capture_dump_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 256,
            voice: "Kore".to_string(),
            system_instruction: DEFAULT_INSTRUCTION.to_string(),
            temperature: 0.0,
            interrupt_policy: InterruptPolicy::Hard,
            lead_in: Duration::from_millis(5),
            grace: Duration::from_millis(100),
            summary_interval: Duration::from_secs(8),
            summary_min_entries: 4,
            capture_dump_path: None,
        }
    }
}

impl SessionConfig {
    /// Derive a session config from the application config.
    pub fn from_app(config: &crate::config::Config) -> Self {
        Self {
            input_sample_rate: config.audio.input_sample_rate,
            output_sample_rate: config.audio.output_sample_rate,
            frame_samples: config.audio.frame_samples,
            voice: config.session.voice.clone(),
            system_instruction: config
                .session
                .system_instruction
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
            interrupt_policy: config.session.interrupt_policy,
            lead_in: Duration::from_millis(config.session.lead_in_ms),
            grace: Duration::from_millis(config.session.grace_ms),
            summary_interval: Duration::from_secs(config.summary.interval_secs),
            summary_min_entries: config.summary.min_entries,
            capture_dump_path: config.audio.capture_dump_path.clone(),
            ..Self::default()
        }
    }
}
