//! Duplex channel to the remote conversational audio service.
//!
//! The session only sees the small closed surface in this module: a
//! `SessionTransport` that opens a channel and the `TransportHandle` it
//! returns. Implementations (the WebSocket client, test doubles) bridge
//! the handle's channels to an actual wire.

pub mod messages;
pub mod websocket;

pub use messages::{AudioMessage, MediaBlob, ServerMessage, SetupMessage};
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::audio::EncodedPayload;
use crate::error::SessionError;

/// Outbound frames buffered toward the wire before frames start dropping.
const OUTBOUND_QUEUE: usize = 64;
/// Inbound events buffered toward the session loop.
const EVENT_QUEUE: usize = 256;

/// Everything the remote service can tell us, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Synthesized speech, PCM16LE at the session's output rate
    AudioChunk(Vec<u8>),
    /// Incremental transcription of the captured microphone audio
    InputTranscriptDelta(String),
    /// Incremental transcription of the agent's synthesized speech
    OutputTranscriptDelta(String),
    /// The current exchange is over; turn state resets on both sides
    TurnComplete,
    /// The agent was cut off mid-utterance
    Interrupted,
}

/// Session parameters handed to `SessionTransport::open`.
#[derive(Debug, Clone)]
pub struct SessionDirectives {
    /// System instruction with the knowledge blob already folded in
    pub system_instruction: String,
    /// Synthesized voice requested from the service
    pub voice: String,
    /// Pinned at or near zero so responses stay deterministic
    pub temperature: f32,
    /// Skip extended deliberation for minimum latency
    pub disable_thinking: bool,
    /// Rate of the PCM frames that will be sent upstream
    pub input_sample_rate: u32,
}

/// Opens a duplex channel to the service.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn open(
        &self,
        directives: &SessionDirectives,
    ) -> Result<TransportHandle, SessionError>;
}

/// The session-facing end of an open channel.
pub struct TransportHandle {
    sender: TransportSender,
    events: mpsc::Receiver<ServerEvent>,
}

/// The outbound half of a handle: fire-and-forget sends plus close.
pub struct TransportSender {
    outbound: mpsc::Sender<EncodedPayload>,
    close_tx: watch::Sender<bool>,
}

/// The implementation-facing ends of a `TransportHandle`.
pub struct TransportWires {
    /// Frames the session wants on the wire
    pub outbound: mpsc::Receiver<EncodedPayload>,
    /// Where parsed server events are delivered
    pub events: mpsc::Sender<ServerEvent>,
    /// Flips to true exactly once, when the handle is closed
    pub closed: watch::Receiver<bool>,
}

impl TransportHandle {
    /// Create a connected handle/wires pair.
    pub fn pair() -> (TransportHandle, TransportWires) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (close_tx, close_rx) = watch::channel(false);

        (
            TransportHandle {
                sender: TransportSender {
                    outbound: outbound_tx,
                    close_tx,
                },
                events: event_rx,
            },
            TransportWires {
                outbound: outbound_rx,
                events: event_tx,
                closed: close_rx,
            },
        )
    }

    /// Fire-and-forget send; see [`TransportSender::send`].
    pub fn send(&self, payload: EncodedPayload) -> bool {
        self.sender.send(payload)
    }

    /// Next inbound event; `None` once the channel has ended.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Close the channel. Idempotent; safe to call when already closed.
    pub fn close(&self) {
        self.sender.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Separate the outbound half from the event stream so one task can
    /// send while another future awaits events.
    pub fn split(self) -> (TransportSender, mpsc::Receiver<ServerEvent>) {
        (self.sender, self.events)
    }
}

impl TransportSender {
    /// Fire-and-forget send. After close, or when the wire cannot take the
    /// frame right now, it is dropped: frames are never queued beyond the
    /// small wire buffer and never retried. Returns whether the frame was
    /// accepted, which callers may count but must not act on.
    pub fn send(&self, payload: EncodedPayload) -> bool {
        if *self.close_tx.borrow() {
            return false;
        }
        match self.outbound.try_send(payload) {
            Ok(()) => true,
            Err(_) => {
                debug!("Outbound frame dropped");
                false
            }
        }
    }

    /// Close the channel. Idempotent; safe to call when already closed.
    pub fn close(&self) {
        self.close_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow()
    }
}
