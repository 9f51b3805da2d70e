//! Error taxonomy for session setup.
//!
//! Only connect-time failures are surfaced to callers. Everything that can
//! go wrong mid-session (an unsendable frame, a malformed inbound chunk, a
//! summary that never arrives) degrades in place and is logged instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// No usable audio device, or the platform denied access to it.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The transport failed to open its channel to the remote service.
    #[error("Connection failed: {0}")]
    Connection(String),
}
