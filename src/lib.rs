pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod knowledge;
pub mod session;
pub mod summary;
pub mod transcript;
pub mod transport;

pub use audio::{
    decode_chunk, encode_frame, input_level, pcm_mime_type, AudioFrame, AudioSink, CaptureBackend,
    CaptureConfig, CaptureDump, CpalBackend, DecodeError, EncodedPayload, PlaybackScheduler,
    PlaybackUnit, RodioSink,
};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use knowledge::{FileKnowledgeStore, KnowledgeStore};
pub use session::{
    InterruptPolicy, LiveSession, SessionConfig, SessionEvent, SessionStats, TranscriptEntry,
};
pub use summary::{NoSummary, SummaryService};
pub use transcript::{Speaker, TranscriptAssembler, TurnUpdate};
pub use transport::{
    ServerEvent, SessionDirectives, SessionTransport, TransportHandle, TransportSender,
    TransportWires, WebSocketTransport,
};
