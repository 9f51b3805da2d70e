use super::state::AppState;
use crate::audio::{CaptureConfig, CpalBackend, RodioSink};
use crate::session::{
    InterruptPolicy, LiveSession, SessionConfig, SessionEvent, SessionStats, TranscriptEntry,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Override the configured interruption policy for this session
    pub interrupt_policy: Option<InterruptPolicy>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Connect a new live session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let mut slot = state.session.write().await;

    if slot.as_ref().map(|s| s.is_connected()).unwrap_or(false) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A session is already connected".to_string(),
            }),
        )
            .into_response();
    }

    let mut config = SessionConfig::from_app(&state.config);
    if let Some(session_id) = req.session_id {
        config.session_id = session_id;
    }
    if let Some(policy) = req.interrupt_policy {
        config.interrupt_policy = policy;
    }
    let session_id = config.session_id.clone();

    info!("Starting session: {}", session_id);

    let capture = Box::new(CpalBackend::new(CaptureConfig {
        sample_rate: config.input_sample_rate,
        frame_samples: config.frame_samples,
    }));

    let sink = match RodioSink::spawn() {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            error!("Failed to open playback device: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to open playback device: {}", e),
                }),
            )
                .into_response();
        }
    };

    let session = match LiveSession::connect(
        config,
        capture,
        sink,
        state.transport.as_ref(),
        state.knowledge.as_ref(),
        Arc::clone(&state.summary),
    )
    .await
    {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to connect session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to connect session: {}", e),
                }),
            )
                .into_response();
        }
    };

    // Drain session events into the log so the channel never backs up.
    if let Some(mut events) = session.take_events() {
        let id = session_id.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SessionEvent::Transcript(entry) => {
                        info!(session = %id, speaker = ?entry.speaker, turn = entry.turn_id, "{}", entry.text);
                    }
                    SessionEvent::AgentSpeaking(speaking) => {
                        debug!(session = %id, speaking, "Agent speaking state changed");
                    }
                    SessionEvent::Summary(_) => {
                        info!(session = %id, "Summary updated");
                    }
                    SessionEvent::InputLevel(_) => {}
                }
            }
        });
    }

    *slot = Some(session);

    info!("Session started successfully: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: session_id.clone(),
            status: "connected".to_string(),
            message: format!("Session {} connected", session_id),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// Disconnect the active session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.session.write().await;
        slot.take()
    };

    match session {
        Some(session) => {
            let session_id = session.id().to_string();
            info!("Stopping session: {}", session_id);

            session.disconnect().await;
            let stats = session.stats();

            info!("Session stopped successfully: {}", session_id);
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id,
                    status: "disconnected".to_string(),
                    message: "Session disconnected".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
/// Get statistics for the active session
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/transcript
/// Get the live transcript view (accumulated so far)
pub async fn session_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => {
            let transcript: Vec<TranscriptEntry> = session.transcript().await;
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/summary
/// Get the latest transcript summary
pub async fn session_summary(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => (
            StatusCode::OK,
            Json(SummaryResponse {
                summary: session.summary().await,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /knowledge
/// Read the knowledge blob
pub async fn get_knowledge(State(state): State<AppState>) -> impl IntoResponse {
    let text = state.knowledge.get().await;
    (StatusCode::OK, Json(KnowledgeBody { text })).into_response()
}

/// PUT /knowledge
/// Replace the knowledge blob; picked up at the next connect
pub async fn set_knowledge(
    State(state): State<AppState>,
    Json(body): Json<KnowledgeBody>,
) -> impl IntoResponse {
    match state.knowledge.set(&body.text).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to store knowledge: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to store knowledge: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
