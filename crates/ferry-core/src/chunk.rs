//! Chunks: the unit of translation work.
//!
//! A chunk is typically one source file or one logical code block. Chunks
//! are created when the work plan is built and are never deleted — they only
//! transition between statuses.

use serde::{Deserialize, Serialize};

use crate::ids::ChunkId;
use crate::stage::Stage;

/// Lifecycle status of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    /// Waiting to be processed.
    Pending,
    /// Translation accepted; `content_out` is set.
    Converted,
    /// Last attempt failed; will be retried or escalated.
    Failed,
    /// Escalated to the manual fix queue.
    Manual,
    /// Resolved without output (human skip).
    Skipped,
}

impl ChunkStatus {
    /// Whether this status counts toward stage completion.
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Converted | Self::Skipped)
    }

    /// Whether the processing loop is done with this chunk.
    ///
    /// `Failed` is transient: retries happen within a single pass over the
    /// chunk, so a chunk left in `Failed` would be picked up again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converted | Self::Skipped | Self::Manual)
    }
}

/// One unit of translation work and its bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier.
    pub chunk_id: ChunkId,
    /// Source file the chunk came from.
    pub file_path: String,
    /// Stage this chunk belongs to.
    pub stage: Stage,
    /// Current status.
    pub status: ChunkStatus,
    /// Original content to translate.
    pub content_in: String,
    /// Accepted translation, once converted.
    pub content_out: Option<String>,
    /// Translator-reported failures so far. Bounded by the retry limit;
    /// model switches do not count.
    pub attempt_count: u32,
    /// Tokens consumed across all attempts.
    pub tokens_used: u64,
    /// Spend accounted to this chunk across all attempts.
    pub cost_usd: f64,
    /// Model that produced the accepted output.
    pub model: Option<String>,
    /// Most recent failure message.
    pub last_error: Option<String>,
}

impl Chunk {
    /// A fresh pending chunk.
    #[must_use]
    pub fn new(file_path: impl Into<String>, stage: Stage, content_in: impl Into<String>) -> Self {
        Self {
            chunk_id: ChunkId::new(),
            file_path: file_path.into(),
            stage,
            status: ChunkStatus::Pending,
            content_in: content_in.into(),
            content_out: None,
            attempt_count: 0,
            tokens_used: 0,
            cost_usd: 0.0,
            model: None,
            last_error: None,
        }
    }

    /// Mark converted with the accepted output.
    pub fn mark_converted(&mut self, content_out: String, model: Option<String>) {
        self.status = ChunkStatus::Converted;
        self.content_out = Some(content_out);
        self.model = model;
        self.last_error = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
