//! Engine error types.
//!
//! Chunk-level failures never appear here — they are absorbed into the
//! manual fix queue inside the processing loop. These errors surface to
//! callers of the orchestrator API.

use ferry_core::SessionStatus;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the orchestrator API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No session with the given id, active or persisted.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The requested operation is not valid in the session's current status.
    #[error("session {session_id} is {status:?}; cannot {action}")]
    InvalidTransition {
        /// Session id.
        session_id: String,
        /// Status at the time of the call.
        status: SessionStatus,
        /// The rejected action.
        action: &'static str,
    },

    /// The chunk has no pending manual fix entry.
    #[error("no pending manual fix for chunk {0}")]
    ManualFixNotPending(String),

    /// No chunk with the given id in the session.
    #[error("chunk not found: {0}")]
    ChunkNotFound(String),

    /// Checkpoint store failure. Session-fatal when raised from the
    /// processing loop; recoverable via resume-failed.
    #[error(transparent)]
    Store(#[from] ferry_store::StoreError),

    /// Settings failed creation-time validation.
    #[error(transparent)]
    Settings(#[from] ferry_settings::SettingsError),
}

impl EngineError {
    /// Shorthand for an invalid-transition error.
    #[must_use]
    pub fn invalid_transition(
        session_id: impl Into<String>,
        status: SessionStatus,
        action: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            session_id: session_id.into(),
            status,
            action,
        }
    }
}
