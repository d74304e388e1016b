//! Session identity and lifecycle enums.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Conversion direction between the two supported platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// macOS project to Windows project.
    #[serde(rename = "mac-to-win")]
    MacToWin,
    /// Windows project to macOS project.
    #[serde(rename = "win-to-mac")]
    WinToMac,
}

impl Direction {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MacToWin => "mac-to-win",
            Self::WinToMac => "win-to-mac",
        }
    }
}

/// Session lifecycle status.
///
/// Transitions:
/// `Created → Queued → Running → {Paused, Completed, Failed}`,
/// `Paused → Running`, `Failed → Running` (resume-failed replays from the
/// last checkpoint).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not yet submitted to the worker pool.
    Created,
    /// Waiting for a worker-pool slot.
    Queued,
    /// Actively processing chunks.
    Running,
    /// Parked at a chunk boundary; resumable.
    Paused,
    /// Every stage complete, no blocking manual fixes. Terminal.
    Completed,
    /// Unrecoverable error; recoverable only via resume-failed. Terminal.
    Failed,
}

impl SessionStatus {
    /// Whether this is a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a session is paused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// A caller asked for the pause.
    Requested,
    /// Budget exhausted with no fallback model left.
    BudgetExhausted,
    /// No pending chunks remain but pending manual fixes block completion.
    AwaitingManualFixes,
}

/// Immutable identity of one conversion run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Unique session identifier.
    pub id: SessionId,
    /// Conversion direction.
    pub direction: Direction,
    /// Source project root.
    pub source_path: String,
    /// Target project root.
    pub target_path: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
