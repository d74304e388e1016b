//! The public orchestrator surface.
//!
//! Holds the active-session map, the shared collaborator seams
//! (translator, planner, validator, backup, estimator), the admission
//! gate, and the persistence handle. Every operation of the external API
//! lives here: start/pause/resume/cancel, status, manual fixes, learned
//! patterns, webhooks, batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ferry_core::{
    Direction, ManualFixEntry, SessionId, SessionMeta, SessionStatus, SessionSummary,
    WebhookConfig,
};
use ferry_router::{CostEstimator, PricingTable, Translator};
use ferry_settings::FerrySettings;
use ferry_store::{Store, StoreError};
use ferry_webhooks::{DeliveryResult, WebhookDispatcher};

use crate::errors::{EngineError, Result};
use crate::manual::apply_learned_patterns;
use crate::pipeline::Planner;
use crate::session::{self, RunnerContext, SessionCell};
use crate::state::SessionState;
use crate::validate::{BackupStore, Validator};

/// Collaborators and defaults for building an [`Orchestrator`].
pub struct OrchestratorOptions {
    /// Persistence handle.
    pub store: Arc<Store>,
    /// Work-plan provider (the seam to external project detection).
    pub planner: Arc<dyn Planner>,
    /// The translate capability.
    pub translator: Arc<dyn Translator>,
    /// Optional toolchain validation capability.
    pub validator: Option<Arc<dyn Validator>>,
    /// Optional post-completion backup capability.
    pub backup: Option<Arc<dyn BackupStore>>,
    /// Cost estimator. Defaults to the built-in pricing table.
    pub estimator: Option<Arc<dyn CostEstimator>>,
    /// Default settings applied to sessions that do not override them.
    pub defaults: FerrySettings,
}

/// Parameters for starting one session.
#[derive(Clone, Debug)]
pub struct StartSessionRequest {
    /// Source project root.
    pub source_path: String,
    /// Target project root.
    pub target_path: String,
    /// Conversion direction.
    pub direction: Direction,
    /// Settings override; orchestrator defaults when absent. The snapshot
    /// is captured at start and never mutated mid-run.
    pub settings: Option<FerrySettings>,
}

/// The conversion session orchestrator.
pub struct Orchestrator {
    store: Arc<Store>,
    planner: Arc<dyn Planner>,
    translator: Arc<dyn Translator>,
    validator: Option<Arc<dyn Validator>>,
    backup: Option<Arc<dyn BackupStore>>,
    estimator: Arc<dyn CostEstimator>,
    dispatcher: Arc<WebhookDispatcher>,
    defaults: FerrySettings,
    admission: Arc<Semaphore>,
    sessions: DashMap<String, Arc<SessionCell>>,
}

impl Orchestrator {
    /// Build an orchestrator. Validates the default settings once.
    pub fn new(options: OrchestratorOptions) -> Result<Self> {
        options.defaults.validate()?;
        let dispatcher = Arc::new(WebhookDispatcher::new(options.defaults.delivery.clone()));
        let admission = Arc::new(Semaphore::new(
            options.defaults.performance.parallel_conversions,
        ));
        Ok(Self {
            store: options.store,
            planner: options.planner,
            translator: options.translator,
            validator: options.validator,
            backup: options.backup,
            estimator: options
                .estimator
                .unwrap_or_else(|| Arc::new(PricingTable::default())),
            dispatcher,
            defaults: options.defaults,
            admission,
            sessions: DashMap::new(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a session, persist its initial snapshot, and submit it to
    /// the worker pool. Returns the id immediately; the session runs
    /// asynchronously.
    pub fn start_session(&self, request: StartSessionRequest) -> Result<SessionId> {
        let settings = request.settings.unwrap_or_else(|| self.defaults.clone());
        settings.validate()?;

        let plan = self.planner.plan(&request.source_path, request.direction);
        let meta = SessionMeta {
            id: SessionId::new(),
            direction: request.direction,
            source_path: request.source_path,
            target_path: request.target_path,
            created_at: ferry_core::now_rfc3339(),
        };
        let state = SessionState::plan(meta, settings, plan);
        let session_id = state.meta.id.clone();

        self.store.upsert_snapshot(&state.to_snapshot())?;
        let cell = self.install_cell(state);
        self.spawn(&cell);

        info!(session_id = %session_id, "session started");
        Ok(session_id)
    }

    /// Request a cooperative pause. Takes effect at the next chunk
    /// boundary; the in-flight dispatch is never interrupted.
    pub fn pause_session(&self, session_id: &str) -> Result<()> {
        let cell = self.active_cell(session_id)?;
        let status = { cell.state.lock().status };
        match status {
            SessionStatus::Running | SessionStatus::Queued => {
                cell.pause_flag.store(true, Ordering::SeqCst);
                debug!(session_id, "pause requested");
                Ok(())
            }
            status => Err(EngineError::invalid_transition(session_id, status, "pause")),
        }
    }

    /// Resume a paused session.
    ///
    /// Re-admits the session to the worker pool. In-memory state is reused
    /// when the session is still resident; after a process restart the
    /// state is reconstructed from the checkpoint store, positioned at the
    /// next pending chunk.
    pub fn resume_session(&self, session_id: &str) -> Result<()> {
        if let Some(entry) = self.sessions.get(session_id) {
            let cell = entry.value().clone();
            drop(entry);
            let status = { cell.state.lock().status };
            if status != SessionStatus::Paused {
                return Err(EngineError::invalid_transition(session_id, status, "resume"));
            }
            self.spawn(&cell);
            info!(session_id, "session resumed in memory");
            return Ok(());
        }

        let snapshot = self.load_snapshot(session_id)?;
        if snapshot.status != SessionStatus::Paused {
            return Err(EngineError::invalid_transition(
                session_id,
                snapshot.status,
                "resume",
            ));
        }
        let cell = self.install_cell(SessionState::from_snapshot(snapshot));
        self.spawn(&cell);
        info!(session_id, "session resumed from checkpoint");
        Ok(())
    }

    /// Resume a paused session with an explicit settings override.
    ///
    /// The one sanctioned way to change a session's settings mid-run: a
    /// session paused for budget exhaustion resumes with a raised budget
    /// without losing any work. The new snapshot replaces the old one
    /// before re-admission.
    pub fn resume_session_with_settings(
        &self,
        session_id: &str,
        settings: FerrySettings,
    ) -> Result<()> {
        settings.validate()?;
        self.with_session_state(session_id, |state| {
            if state.status != SessionStatus::Paused {
                return Err(EngineError::invalid_transition(
                    session_id,
                    state.status,
                    "resume with settings",
                ));
            }
            state.settings = settings;
            state.push_note("Settings updated on resume".to_string());
            Ok(())
        })?;
        self.resume_session(session_id)
    }

    /// Re-enter a failed session from its last checkpoint.
    ///
    /// Always reconstructs from the store — in-memory state of the failed
    /// run is discarded, so no partially-applied work leaks forward.
    pub fn resume_failed_session(&self, session_id: &str) -> Result<()> {
        let snapshot = self.load_snapshot(session_id)?;
        if snapshot.status != SessionStatus::Failed {
            return Err(EngineError::invalid_transition(
                session_id,
                snapshot.status,
                "resume_failed",
            ));
        }
        if let Some((_, stale)) = self.sessions.remove(session_id) {
            stale.cancel.cancel();
        }
        let cell = self.install_cell(SessionState::from_snapshot(snapshot));
        self.spawn(&cell);
        info!(session_id, "failed session re-entered from checkpoint");
        Ok(())
    }

    /// Cancel a session: tear down without further checkpointing. The
    /// persisted state stays at the last chunk boundary.
    pub fn cancel_session(&self, session_id: &str) -> Result<()> {
        let cell = self.active_cell(session_id)?;
        cell.cancel.cancel();
        info!(session_id, "session cancelled");
        Ok(())
    }

    /// Delete a session and its snapshot. Explicit deletion is the only
    /// way a session is ever destroyed.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        if let Some((_, cell)) = self.sessions.remove(session_id) {
            cell.cancel.cancel();
        }
        Ok(self.store.delete_snapshot(session_id)?)
    }

    /// Wait for a session's current run to park (pause, completion,
    /// failure, or cancellation).
    pub async fn join_session(&self, session_id: &str) -> Result<()> {
        let handle = {
            let cell = self.active_cell(session_id)?;
            let mut task = cell.task.lock();
            task.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────

    /// Cheap, side-effect-free status summary. Safe to poll concurrently
    /// with the processing loop.
    pub fn get_status(&self, session_id: &str) -> Result<SessionSummary> {
        if let Some(cell) = self.sessions.get(session_id) {
            return Ok(cell.state.lock().summary());
        }
        let snapshot = self.load_snapshot(session_id)?;
        Ok(SessionState::from_snapshot(snapshot).summary())
    }

    /// All persisted sessions with their statuses, newest first.
    pub fn list_sessions(&self) -> Result<Vec<(String, SessionStatus)>> {
        Ok(self.store.list_snapshots()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Manual fixes & learned patterns
    // ─────────────────────────────────────────────────────────────────────

    /// Pending manual fix entries for a session.
    pub fn list_manual_fixes(&self, session_id: &str) -> Result<Vec<ManualFixEntry>> {
        if let Some(cell) = self.sessions.get(session_id) {
            return Ok(cell.state.lock().pending_fixes());
        }
        let snapshot = self.load_snapshot(session_id)?;
        Ok(SessionState::from_snapshot(snapshot).pending_fixes())
    }

    /// Apply a human-supplied replacement to an escalated chunk.
    ///
    /// The fix is recorded in the cross-session learning store; once the
    /// same signature accumulates enough identical fixes it is promoted
    /// for automatic reuse.
    pub fn apply_manual_fix(
        &self,
        session_id: &str,
        chunk_id: &str,
        content: &str,
        note: Option<&str>,
        submitted_by: Option<&str>,
    ) -> Result<()> {
        let (fix, learning_enabled, trigger_count) =
            self.with_session_state(session_id, |state| {
                let fix = state.apply_manual_fix(chunk_id, content, note, submitted_by)?;
                Ok((
                    fix,
                    state.settings.conversion.enable_learning,
                    state.settings.conversion.learning_trigger_count,
                ))
            })?;

        if learning_enabled {
            let _ = self.store.record_fix(
                &fix.fingerprint,
                &fix.replacement,
                trigger_count,
                fix.note.as_deref(),
            )?;
        }
        Ok(())
    }

    /// Skip an escalated chunk (resolved without output).
    pub fn skip_manual_fix(
        &self,
        session_id: &str,
        chunk_id: &str,
        note: Option<&str>,
    ) -> Result<()> {
        self.with_session_state(session_id, |state| state.skip_manual_fix(chunk_id, note))
    }

    /// Auto-apply promoted learned patterns to the session's pending
    /// entries. Returns the number applied.
    pub fn apply_learned_patterns(&self, session_id: &str) -> Result<usize> {
        let store = self.store.clone();
        self.with_session_state(session_id, move |state| {
            apply_learned_patterns(state, &store)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────

    /// Register (or replace) a webhook endpoint.
    pub fn register_webhook(&self, config: &WebhookConfig) -> Result<()> {
        Ok(self.store.upsert_webhook(config)?)
    }

    /// List registered webhook endpoints.
    pub fn list_webhooks(&self) -> Result<Vec<WebhookConfig>> {
        Ok(self.store.list_webhooks()?)
    }

    /// Send a synthetic test event to one endpoint.
    pub async fn test_webhook(&self, config: &WebhookConfig) -> DeliveryResult {
        self.dispatcher.test_delivery(config).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Mutate a session's state under the single-writer lock (active) or
    /// through a load-modify-store cycle (not resident), checkpointing the
    /// result either way.
    fn with_session_state<T>(
        &self,
        session_id: &str,
        mutate: impl FnOnce(&mut SessionState) -> Result<T>,
    ) -> Result<T> {
        if let Some(entry) = self.sessions.get(session_id) {
            let cell = entry.value().clone();
            drop(entry);
            let (result, snapshot) = {
                let mut state = cell.state.lock();
                let result = mutate(&mut state)?;
                (result, state.to_snapshot())
            };
            self.store.upsert_snapshot(&snapshot)?;
            return Ok(result);
        }

        let snapshot = self.load_snapshot(session_id)?;
        let mut state = SessionState::from_snapshot(snapshot);
        let result = mutate(&mut state)?;
        self.store.upsert_snapshot(&state.to_snapshot())?;
        Ok(result)
    }

    fn active_cell(&self, session_id: &str) -> Result<Arc<SessionCell>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_owned()))
    }

    fn load_snapshot(&self, session_id: &str) -> Result<ferry_store::SessionSnapshot> {
        self.store.load_snapshot(session_id).map_err(|err| match err {
            StoreError::NotFound { .. } => EngineError::SessionNotFound(session_id.to_owned()),
            err => err.into(),
        })
    }

    fn install_cell(&self, state: SessionState) -> Arc<SessionCell> {
        let session_id = state.meta.id.as_str().to_owned();
        let cell = Arc::new(SessionCell {
            state: Arc::new(Mutex::new(state)),
            pause_flag: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        });
        let _ = self.sessions.insert(session_id, cell.clone());
        cell
    }

    fn spawn(&self, cell: &Arc<SessionCell>) {
        cell.pause_flag.store(false, Ordering::SeqCst);
        let ctx = RunnerContext {
            state: cell.state.clone(),
            pause_flag: cell.pause_flag.clone(),
            cancel: cell.cancel.clone(),
            store: self.store.clone(),
            translator: self.translator.clone(),
            validator: self.validator.clone(),
            backup: self.backup.clone(),
            estimator: self.estimator.clone(),
            dispatcher: self.dispatcher.clone(),
            admission: self.admission.clone(),
        };
        let handle = tokio::spawn(session::run(ctx));
        let mut task = cell.task.lock();
        *task = Some(handle);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("active_sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
