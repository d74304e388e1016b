//! Manual fix queue operations.
//!
//! Chunks the pipeline cannot resolve automatically are escalated here.
//! Entries are idempotent per chunk (re-enqueuing appends a note), resolved
//! by explicit apply or skip, and retained after resolution for audit.

use ferry_core::{
    fingerprint, ChunkStatus, ManualFixEntry, ManualFixReason, ManualFixStatus,
};
use ferry_store::Store;
use tracing::{debug, info};

use crate::errors::{EngineError, Result};
use crate::state::SessionState;

/// Outcome of applying one manual fix, fed into pattern learning.
#[derive(Clone, Debug)]
pub struct AppliedFix {
    /// Signature of the chunk's original content.
    pub fingerprint: String,
    /// The accepted replacement.
    pub replacement: String,
    /// Note recorded with the fix, if any.
    pub note: Option<String>,
}

impl SessionState {
    /// Escalate a chunk to the manual fix queue.
    ///
    /// Idempotent per chunk id: if a pending entry already exists, the new
    /// context is appended as a note instead of duplicating the entry.
    pub fn enqueue_manual(
        &mut self,
        chunk_index: usize,
        reason: ManualFixReason,
        note: impl Into<String>,
    ) {
        let note = note.into();
        let (chunk_id, file_path, signature) = {
            let chunk = &mut self.chunks[chunk_index];
            chunk.status = ChunkStatus::Manual;
            (
                chunk.chunk_id.clone(),
                chunk.file_path.clone(),
                fingerprint(&chunk.content_in),
            )
        };

        if let Some(entry) = self
            .manual_queue
            .iter_mut()
            .find(|e| e.chunk_id == chunk_id && e.status == ManualFixStatus::Pending)
        {
            entry.push_note(note);
            debug!(chunk_id = %chunk_id, "manual entry already pending, note appended");
            return;
        }

        let mut entry = ManualFixEntry::new(chunk_id.clone(), file_path, reason, note);
        entry.fingerprint = Some(signature);
        self.manual_queue.push(entry);
        info!(chunk_id = %chunk_id, reason = reason.as_str(), "chunk escalated to manual queue");
    }

    /// Apply a human-supplied replacement to a pending entry.
    ///
    /// Sets the chunk's output, marks it converted, and returns the
    /// `(signature, replacement)` pair for pattern learning.
    pub fn apply_manual_fix(
        &mut self,
        chunk_id: &str,
        content: &str,
        note: Option<&str>,
        submitted_by: Option<&str>,
    ) -> Result<AppliedFix> {
        let entry = self
            .manual_queue
            .iter_mut()
            .find(|e| e.chunk_id.as_str() == chunk_id && e.status == ManualFixStatus::Pending)
            .ok_or_else(|| EngineError::ManualFixNotPending(chunk_id.to_owned()))?;

        entry.status = ManualFixStatus::Applied;
        entry.submitted_by = submitted_by.map(ToOwned::to_owned);
        if let Some(note) = note {
            entry.push_note(note.to_owned());
        }
        let signature = entry.fingerprint.clone();

        let index = self
            .chunk_index(chunk_id)
            .ok_or_else(|| EngineError::ChunkNotFound(chunk_id.to_owned()))?;
        let signature =
            signature.unwrap_or_else(|| fingerprint(&self.chunks[index].content_in));
        self.chunks[index].mark_converted(content.to_owned(), None);
        self.recompute_progress();

        Ok(AppliedFix {
            fingerprint: signature,
            replacement: content.to_owned(),
            note: note.map(ToOwned::to_owned),
        })
    }

    /// Resolve a pending entry without output; the chunk is skipped.
    pub fn skip_manual_fix(&mut self, chunk_id: &str, note: Option<&str>) -> Result<()> {
        let entry = self
            .manual_queue
            .iter_mut()
            .find(|e| e.chunk_id.as_str() == chunk_id && e.status == ManualFixStatus::Pending)
            .ok_or_else(|| EngineError::ManualFixNotPending(chunk_id.to_owned()))?;

        entry.status = ManualFixStatus::Skipped;
        if let Some(note) = note {
            entry.push_note(note.to_owned());
        }

        let index = self
            .chunk_index(chunk_id)
            .ok_or_else(|| EngineError::ChunkNotFound(chunk_id.to_owned()))?;
        self.chunks[index].status = ChunkStatus::Skipped;
        self.recompute_progress();
        Ok(())
    }

    /// Pending entries only — resolved entries are audit history, never
    /// surfaced to a human.
    #[must_use]
    pub fn pending_fixes(&self) -> Vec<ManualFixEntry> {
        self.manual_queue
            .iter()
            .filter(|e| e.status == ManualFixStatus::Pending)
            .cloned()
            .collect()
    }
}

/// Auto-apply promoted learned patterns to pending entries.
///
/// Scans the pending queue; entries whose content signature matches a
/// promoted pattern are applied as if a human had, with
/// `submitted_by = "auto-pattern"`. Returns the number applied.
pub fn apply_learned_patterns(state: &mut SessionState, store: &Store) -> Result<usize> {
    let pending: Vec<String> = state
        .pending_fixes()
        .into_iter()
        .map(|e| e.chunk_id.into_inner())
        .collect();

    let mut applied = 0usize;
    for chunk_id in pending {
        let Some(index) = state.chunk_index(&chunk_id) else {
            continue;
        };
        let signature = fingerprint(&state.chunks[index].content_in);
        let Some(pattern) = store.promoted_pattern(&signature)? else {
            continue;
        };
        let _ = state.apply_manual_fix(
            &chunk_id,
            &pattern.replacement,
            Some("resolved by learned pattern"),
            Some("auto-pattern"),
        )?;
        store.record_auto_attempt(&signature, true)?;
        applied += 1;
        info!(chunk_id, "learned pattern auto-applied");
    }
    Ok(applied)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
