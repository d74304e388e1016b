//! Manual fix queue entries.
//!
//! When the pipeline cannot resolve a chunk automatically it is escalated
//! for human resolution. Entries are retained after resolution for audit;
//! only `pending` entries are ever surfaced to a human.

use serde::{Deserialize, Serialize};

use crate::ids::ChunkId;

/// Why a chunk was escalated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualFixReason {
    /// The translator failed after the bounded retries.
    TranslationFailed,
    /// Toolchain validation flagged the converted output as blocking.
    ValidationFailed,
    /// Budget ran out mid-chunk with no fallback model left.
    BudgetExhausted,
    /// A security scan flagged the content.
    SecurityFlag,
}

impl ManualFixReason {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TranslationFailed => "translation_failed",
            Self::ValidationFailed => "validation_failed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::SecurityFlag => "security_flag",
        }
    }
}

/// Resolution status of a manual fix entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualFixStatus {
    /// Awaiting human resolution.
    Pending,
    /// A replacement was applied; the chunk is converted.
    Applied,
    /// Resolved without output; the chunk is skipped.
    Skipped,
}

/// A chunk escalated for human resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManualFixEntry {
    /// The escalated chunk.
    pub chunk_id: ChunkId,
    /// Source file of the chunk, for display.
    pub file_path: String,
    /// Why the chunk was escalated.
    pub reason: ManualFixReason,
    /// Append-only notes (escalation context, re-enqueue reasons,
    /// reviewer comments).
    pub notes: Vec<String>,
    /// Who resolved the entry, if anyone. `"auto-pattern"` for learned
    /// pattern auto-application.
    pub submitted_by: Option<String>,
    /// Resolution status.
    pub status: ManualFixStatus,
    /// Signature of the chunk's original content, for pattern learning.
    pub fingerprint: Option<String>,
    /// Escalation timestamp (RFC 3339).
    pub created_at: String,
    /// Last mutation timestamp (RFC 3339).
    pub updated_at: String,
}

impl ManualFixEntry {
    /// A fresh pending entry.
    #[must_use]
    pub fn new(
        chunk_id: ChunkId,
        file_path: impl Into<String>,
        reason: ManualFixReason,
        note: impl Into<String>,
    ) -> Self {
        let now = crate::now_rfc3339();
        Self {
            chunk_id,
            file_path: file_path.into(),
            reason,
            notes: vec![note.into()],
            submitted_by: None,
            status: ManualFixStatus::Pending,
            fingerprint: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Append a note and touch the timestamp.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        self.updated_at = crate::now_rfc3339();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
