use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transcript::Speaker;

/// Point-in-time statistics for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is currently connected
    pub connected: bool,

    /// When the session connected
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Captured frames shipped to the service
    pub frames_sent: u64,

    /// Captured frames the transport could not take
    pub frames_dropped: u64,

    /// Inbound audio chunks scheduled for playback
    pub chunks_played: u64,

    /// Inbound audio chunks dropped as undecodable
    pub chunks_skipped: u64,

    /// Completed conversation turns
    pub turns_completed: u64,

    /// Playback units currently scheduled or playing
    pub active_units: u64,

    /// Transcript turns currently accumulating (at most one per speaker)
    pub open_turns: u64,
}

/// One line of the live transcript view, upserted by turn id as deltas
/// arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub turn_id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}
