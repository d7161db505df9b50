//! Engine error types, split by recovery behavior.

use thiserror::Error;

use umbra_transport::TransportError;

/// Failures while establishing a session.
///
/// Each aborts the current reconnect cycle; `InvalidIdentity` is fatal
/// and aborts the engine.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("device identity must be non-empty")]
    InvalidIdentity,

    #[error("failed to establish connection: {0}")]
    ConnectFailed(TransportError),

    #[error("failed to register shadow callbacks: {0}")]
    CallbackRegistration(TransportError),
}

/// Failures of one report sequence. Logged by callers; the cycle is
/// skipped, never retried inline.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("timed out waiting for the report lock")]
    LockTimeout,

    #[error("failed to encode report document: {0}")]
    Encode(String),

    #[error(transparent)]
    Transport(TransportError),
}

/// Failures of a fire-and-forget event publish. Surfaced to the caller;
/// never tears down the session.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no active connection")]
    NotConnected,

    #[error("failed to encode event payload: {0}")]
    Encode(String),

    #[error(transparent)]
    Transport(TransportError),
}
