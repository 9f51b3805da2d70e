//! HTTP API server for external control (companion UI)
//!
//! This module provides a REST API for driving the live session:
//! - POST /session/start - Connect a new live session
//! - POST /session/stop - Disconnect the active session
//! - GET /session/status - Query session statistics
//! - GET /session/transcript - Get the live transcript view
//! - GET /session/summary - Get the latest transcript summary
//! - GET|PUT /knowledge - Read or replace the knowledge blob
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
