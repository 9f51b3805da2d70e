use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transport: TransportSettings,
    pub audio: AudioSettings,
    pub session: SessionSettings,
    pub summary: SummarySettings,
    pub knowledge: KnowledgeSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct TransportSettings {
    /// WebSocket endpoint of the conversational audio service
    pub url: String,
    /// Environment variable holding the API key appended to the URL
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    /// Microphone sample rate sent upstream
    pub input_sample_rate: u32,
    /// Sample rate of synthesized audio received downstream
    pub output_sample_rate: u32,
    /// Samples per captured frame (256 at 16kHz is ~16ms)
    pub frame_samples: usize,
    /// Optional WAV file the captured audio is appended to
    pub capture_dump_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Synthesized voice requested from the service
    pub voice: String,
    /// System instruction; the knowledge blob is folded in at connect time
    pub system_instruction: Option<String>,
    /// What to do with scheduled playback when the service reports an interruption
    pub interrupt_policy: crate::session::InterruptPolicy,
    /// Guard interval before the first scheduled playback unit, in milliseconds
    pub lead_in_ms: u64,
    /// Idle delay before the playback cursor resets, in milliseconds
    pub grace_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SummarySettings {
    /// Polling interval in seconds
    pub interval_secs: u64,
    /// Minimum transcript entries before a summary is requested
    pub min_entries: usize,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeSettings {
    pub path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
