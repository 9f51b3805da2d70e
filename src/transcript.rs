//! Reconstruction of per-speaker turns from incremental transcript deltas.
//!
//! The remote service interleaves input and output transcription fragments
//! with no per-turn framing beyond the turn-complete signal. The assembler
//! keeps one open turn per speaker, appends every delta in arrival order,
//! and emits the full accumulated text so consumers can upsert by turn id
//! without ever duplicating an entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the conversation produced a span of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person at the microphone
    Source,
    /// The remote conversational agent
    Agent,
}

/// Emitted for every applied delta. Consumers replace the entry with the
/// same `turn_id` if one exists in their view, or append it if new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnUpdate {
    pub turn_id: u64,
    pub speaker: Speaker,
    /// Full accumulated text of the turn so far
    pub text: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct OpenTurn {
    id: u64,
    text: String,
    started_at: DateTime<Utc>,
}

/// Per-speaker state machine: idle until the first delta arrives, then
/// accumulating until the next turn-complete.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    next_turn_id: u64,
    source: Option<OpenTurn>,
    agent: Option<OpenTurn>,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta to the speaker's open turn, opening one lazily.
    ///
    /// Turn ids are allocated from one monotonic counter shared by both
    /// speakers, so a reopened turn can never collide with any earlier id.
    /// Empty deltas neither open nor extend a turn.
    pub fn apply_delta(&mut self, speaker: Speaker, delta: &str) -> Option<TurnUpdate> {
        if delta.is_empty() {
            return None;
        }

        let next_turn_id = &mut self.next_turn_id;
        let slot = match speaker {
            Speaker::Source => &mut self.source,
            Speaker::Agent => &mut self.agent,
        };

        let turn = slot.get_or_insert_with(|| {
            let id = *next_turn_id;
            *next_turn_id += 1;
            OpenTurn {
                id,
                text: String::new(),
                started_at: Utc::now(),
            }
        });
        turn.text.push_str(delta);

        Some(TurnUpdate {
            turn_id: turn.id,
            speaker,
            text: turn.text.clone(),
            started_at: turn.started_at,
        })
    }

    /// Close both speakers' turns. The next delta for either speaker opens
    /// a fresh turn with an id distinct from every previous one.
    pub fn complete_turn(&mut self) {
        self.source = None;
        self.agent = None;
    }

    /// Number of currently open turns; never more than one per speaker.
    pub fn open_turns(&self) -> usize {
        usize::from(self.source.is_some()) + usize::from(self.agent.is_some())
    }
}
