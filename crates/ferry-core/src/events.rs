//! Lifecycle event names and status summaries.
//!
//! These types are the shared shape of both `get_status` responses and
//! webhook payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cost::CostState;
use crate::ids::SessionId;
use crate::session::{PauseReason, SessionStatus};
use crate::stage::{Stage, StageProgress};

/// A session lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session entered `Running` for the first time.
    Started,
    /// A stage finished.
    StageCompleted,
    /// The session parked at a chunk boundary.
    Paused,
    /// The session completed.
    Completed,
    /// The session failed.
    Failed,
    /// Synthetic event used by webhook endpoint tests.
    Test,
}

impl SessionEvent {
    /// Wire name, e.g. `"session.stage_completed"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Started => "session.started",
            Self::StageCompleted => "session.stage_completed",
            Self::Paused => "session.paused",
            Self::Completed => "session.completed",
            Self::Failed => "session.failed",
            Self::Test => "webhook.test",
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only summary of a session's progress.
///
/// Cheap to clone; the processing loop publishes a fresh copy after every
/// chunk so status readers never contend with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Why the session is paused, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,
    /// Per-stage progress counters.
    pub stage_progress: BTreeMap<Stage, StageProgress>,
    /// Overall completion fraction in `[0.0, 1.0]`.
    pub overall_percentage: f64,
    /// Spend ledger.
    pub cost: CostState,
    /// Pending manual fix entries.
    pub manual_fixes_pending: usize,
    /// Session notes accumulated so far.
    pub notes: Vec<String>,
}

/// JSON body posted to webhook endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// Event wire name.
    pub event: String,
    /// Session identifier.
    pub session_id: SessionId,
    /// Lifecycle status at fire time.
    pub status: SessionStatus,
    /// Progress summary at fire time.
    pub summary: SessionSummary,
    /// Fire timestamp (RFC 3339).
    pub timestamp: String,
}

impl EventPayload {
    /// Build a payload for the given event from a summary snapshot.
    #[must_use]
    pub fn new(event: SessionEvent, summary: SessionSummary) -> Self {
        Self {
            event: event.name().to_owned(),
            session_id: summary.session_id.clone(),
            status: summary.status,
            summary,
            timestamp: crate::now_rfc3339(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
