//! In-memory session state.
//!
//! [`SessionState`] is the single-writer heart of a session: the processing
//! loop mutates it, checkpoints it after every transition, and everything a
//! status reader sees is a cheap copy of it. It converts losslessly to and
//! from the persisted [`SessionSnapshot`].

use std::collections::BTreeMap;

use ferry_core::{
    Chunk, ChunkStatus, CostState, ManualFixEntry, ManualFixStatus, PauseReason, SessionMeta,
    SessionStatus, SessionSummary, Stage, StageProgress, StageStatus, STAGE_ORDER,
};
use ferry_settings::FerrySettings;
use ferry_store::SessionSnapshot;

use crate::pipeline::WorkPlan;

/// Full in-memory state of one session.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Immutable identity.
    pub meta: SessionMeta,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Whether the session has ever entered `Running`.
    pub started: bool,
    /// Why the session is paused, when it is.
    pub pause_reason: Option<PauseReason>,
    /// Per-stage progress counters.
    pub stage_progress: BTreeMap<Stage, StageProgress>,
    /// Every chunk, in plan order.
    pub chunks: Vec<Chunk>,
    /// Manual fix entries, in escalation order.
    pub manual_queue: Vec<ManualFixEntry>,
    /// Spend ledger.
    pub cost: CostState,
    /// Append-only session notes.
    pub notes: Vec<String>,
    /// Settings captured at session start.
    pub settings: FerrySettings,
    /// When the session was last paused.
    pub paused_at: Option<String>,
}

impl SessionState {
    /// Build the initial state from a work plan.
    ///
    /// Every stage gets a progress row even when the plan assigns it no
    /// chunks; empty stages are vacuously complete.
    #[must_use]
    pub fn plan(meta: SessionMeta, settings: FerrySettings, plan: WorkPlan) -> Self {
        let chunks = plan.into_chunks();
        let mut stage_progress = BTreeMap::new();
        for stage in STAGE_ORDER {
            #[allow(clippy::cast_possible_truncation)]
            let total = chunks.iter().filter(|c| c.stage == stage).count() as u32;
            let _ = stage_progress.insert(stage, StageProgress::new(stage, total));
        }
        let active_model = settings.ai.model.clone();
        Self {
            meta,
            status: SessionStatus::Created,
            started: false,
            pause_reason: None,
            stage_progress,
            chunks,
            manual_queue: Vec::new(),
            cost: CostState::new(active_model),
            notes: Vec::new(),
            settings,
            paused_at: None,
        }
    }

    /// Index of the next chunk to process, if any.
    ///
    /// Walks stages in fixed order and chunks in plan order, so a later
    /// stage is never entered while an earlier stage still has
    /// non-terminal chunks. `Failed` is picked up like `Pending` — a crash
    /// between a failure and its escalation must not strand the chunk.
    #[must_use]
    pub fn next_pending(&self) -> Option<usize> {
        for stage in STAGE_ORDER {
            let candidate = self.chunks.iter().position(|c| {
                c.stage == stage && matches!(c.status, ChunkStatus::Pending | ChunkStatus::Failed)
            });
            if candidate.is_some() {
                return candidate;
            }
        }
        None
    }

    /// Index of a chunk by id.
    #[must_use]
    pub fn chunk_index(&self, chunk_id: &str) -> Option<usize> {
        self.chunks.iter().position(|c| c.chunk_id.as_str() == chunk_id)
    }

    /// Recount per-stage progress from chunk statuses.
    pub fn recompute_progress(&mut self) {
        for (stage, progress) in &mut self.stage_progress {
            let mut completed = 0u32;
            let mut terminal = 0u32;
            for chunk in self.chunks.iter().filter(|c| c.stage == *stage) {
                if chunk.status.is_complete() {
                    completed += 1;
                }
                if chunk.status.is_terminal() {
                    terminal += 1;
                }
            }
            progress.completed_units = completed;
            if terminal == progress.total_units {
                progress.status = StageStatus::Completed;
            } else if terminal > 0 || progress.status == StageStatus::Running {
                progress.status = StageStatus::Running;
            }
        }
    }

    /// Mark a stage as actively running.
    pub fn mark_stage_running(&mut self, stage: Stage) {
        if let Some(progress) = self.stage_progress.get_mut(&stage) {
            if progress.status == StageStatus::Pending {
                progress.status = StageStatus::Running;
            }
        }
    }

    /// Overall completion fraction: the unweighted ratio of completed to
    /// total units across all stages. A planless session is vacuously
    /// complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // unit counts never approach 2^52
    pub fn overall_percentage(&self) -> f64 {
        let total: u32 = self.stage_progress.values().map(|p| p.total_units).sum();
        if total == 0 {
            return 1.0;
        }
        let completed: u32 = self
            .stage_progress
            .values()
            .map(|p| p.completed_units.min(p.total_units))
            .sum();
        f64::from(completed) / f64::from(total)
    }

    /// Whether every stage is fully complete (`completed == total`).
    #[must_use]
    pub fn all_stages_complete(&self) -> bool {
        self.stage_progress
            .values()
            .all(|p| p.completed_units == p.total_units)
    }

    /// Count of manual fix entries still pending.
    #[must_use]
    pub fn pending_manual_count(&self) -> usize {
        self.manual_queue
            .iter()
            .filter(|e| e.status == ManualFixStatus::Pending)
            .count()
    }

    /// Append a session note.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Cheap read-only summary for status polling and webhook payloads.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.meta.id.clone(),
            status: self.status,
            pause_reason: self.pause_reason,
            stage_progress: self.stage_progress.clone(),
            overall_percentage: self.overall_percentage(),
            cost: self.cost.clone(),
            manual_fixes_pending: self.pending_manual_count(),
            notes: self.notes.clone(),
        }
    }

    /// Convert to the persisted snapshot form.
    #[must_use]
    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            meta: self.meta.clone(),
            status: self.status,
            started: self.started,
            pause_reason: self.pause_reason,
            stage_progress: self.stage_progress.clone(),
            chunks: self.chunks.clone(),
            manual_queue: self.manual_queue.clone(),
            cost: self.cost.clone(),
            notes: self.notes.clone(),
            settings: self.settings.clone(),
            updated_at: ferry_core::now_rfc3339(),
            paused_at: self.paused_at.clone(),
        }
    }

    /// Reconstruct from a persisted snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            meta: snapshot.meta,
            status: snapshot.status,
            started: snapshot.started,
            pause_reason: snapshot.pause_reason,
            stage_progress: snapshot.stage_progress,
            chunks: snapshot.chunks,
            manual_queue: snapshot.manual_queue,
            cost: snapshot.cost,
            notes: snapshot.notes,
            settings: snapshot.settings,
            paused_at: snapshot.paused_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
