//! The session processing loop.
//!
//! One task per running session, logically single-threaded: it processes
//! one chunk at a time in stage/plan order, checkpoints after every
//! transition, and ends whenever the session parks (pause, completion,
//! failure, cancellation). Resume spawns a fresh task over the same state.
//!
//! Chunk-level failures are absorbed here — retried with backoff, then
//! escalated to the manual queue. Only checkpoint I/O failures and
//! unrecoverable translator errors fail the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ferry_core::events::EventPayload;
use ferry_core::retry::{calculate_backoff_delay, RetryConfig};
use ferry_core::{
    fingerprint, ChunkStatus, ManualFixReason, PauseReason, SessionEvent, SessionStatus, Stage,
    StageStatus,
};
use ferry_router::{
    estimate_tokens, translate_with_timeout, BudgetCheck, CostEstimator, CostGuardrail,
    ModelRouter, TranslateError, TranslateRequest, Translator,
};
use ferry_store::Store;
use ferry_webhooks::WebhookDispatcher;

use crate::state::SessionState;
use crate::validate::{BackupStore, DiagnosticSeverity, ValidationReport, Validator};

/// Shared per-session cell: the state plus its control signals.
pub(crate) struct SessionCell {
    /// Single-writer session state. The processing loop and API calls
    /// serialize on this lock; it is never held across an await point.
    pub state: Arc<Mutex<SessionState>>,
    /// Cooperative pause request, honored at the next chunk boundary.
    pub pause_flag: Arc<AtomicBool>,
    /// Cancellation: tears down without further checkpointing.
    pub cancel: CancellationToken,
    /// The running task, if any.
    pub task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Everything the processing loop needs, cloned per spawn.
pub(crate) struct RunnerContext {
    pub state: Arc<Mutex<SessionState>>,
    pub pause_flag: Arc<AtomicBool>,
    pub cancel: CancellationToken,
    pub store: Arc<Store>,
    pub translator: Arc<dyn Translator>,
    pub validator: Option<Arc<dyn Validator>>,
    pub backup: Option<Arc<dyn BackupStore>>,
    pub estimator: Arc<dyn CostEstimator>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub admission: Arc<Semaphore>,
}

/// Per-chunk processing outcome.
enum ChunkOutcome {
    /// Converted, escalated, or pattern-applied; the loop continues.
    Processed,
    /// Budget exhausted with no fallback left.
    BudgetExhausted,
    /// Cancellation observed mid-chunk.
    Cancelled,
    /// Unrecoverable error; the session fails.
    Fatal(String),
}

/// Run one session until it parks.
pub(crate) async fn run(ctx: RunnerContext) {
    // Admission gate: wait in `Queued` for a worker-pool slot. A paused
    // session holds no slot — the permit lives only as long as this task.
    {
        let mut state = ctx.state.lock();
        state.status = SessionStatus::Queued;
        state.pause_reason = None;
    }
    if checkpoint(&ctx).is_err() {
        fail_session(&ctx, "checkpoint write failed while queueing").await;
        return;
    }

    let _permit = tokio::select! {
        permit = ctx.admission.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
        () = ctx.cancel.cancelled() => return,
    };

    // Enter `Running`, rebuilding the router from the persisted fallback
    // position so resume lands on the same model.
    let (fire_started, guardrail, mut router, timeout_ms, retry, learning_enabled) = {
        let mut state = ctx.state.lock();
        let fire = !state.started;
        state.started = true;
        state.status = SessionStatus::Running;
        state.pause_reason = None;
        let guardrail = CostGuardrail::new(
            state.settings.cost.enabled,
            state.settings.cost.max_usd,
            state.settings.cost.warn_fraction,
        );
        let router = ModelRouter::new(
            state.settings.ai.model.clone(),
            &state.settings.cost.fallback_chain,
            state.settings.cost.auto_switch_enabled,
        )
        .resume_at(state.cost.fallback_index);
        let timeout_ms = state.settings.ai.translate_timeout_ms;
        let retry = state.settings.retry.clone();
        let learning_enabled = state.settings.conversion.enable_learning;
        state.cost.active_model = router.active_model().to_owned();
        (fire, guardrail, router, timeout_ms, retry, learning_enabled)
    };
    if checkpoint(&ctx).is_err() {
        fail_session(&ctx, "checkpoint write failed on start").await;
        return;
    }
    if fire_started {
        fire_event(&ctx, SessionEvent::Started).await;
    }

    loop {
        if ctx.cancel.is_cancelled() {
            info!("session cancelled; stopping without further checkpoints");
            return;
        }
        if ctx.pause_flag.swap(false, Ordering::SeqCst) {
            park(&ctx, PauseReason::Requested).await;
            return;
        }

        let next = { ctx.state.lock().next_pending() };
        let Some(index) = next else {
            finalize(&ctx).await;
            return;
        };

        // QUALITY chunks are not translated; reaching one means every
        // prior stage is terminal, so the session moves to finalization.
        let stage = { ctx.state.lock().chunks[index].stage };
        if stage == Stage::Quality {
            finalize(&ctx).await;
            return;
        }

        let was_complete = stage_complete(&ctx, stage);
        let outcome = process_chunk(
            &ctx,
            &guardrail,
            &mut router,
            index,
            timeout_ms,
            &retry,
            learning_enabled,
        )
        .await;

        match outcome {
            ChunkOutcome::Processed => {
                if checkpoint(&ctx).is_err() {
                    fail_session(&ctx, "checkpoint write failed after chunk").await;
                    return;
                }
                if !was_complete && stage_complete(&ctx, stage) {
                    fire_event(&ctx, SessionEvent::StageCompleted).await;
                }
            }
            ChunkOutcome::BudgetExhausted => {
                park(&ctx, PauseReason::BudgetExhausted).await;
                return;
            }
            ChunkOutcome::Cancelled => return,
            ChunkOutcome::Fatal(message) => {
                fail_session(&ctx, &message).await;
                return;
            }
        }
    }
}

/// Process one chunk: learned-pattern bypass, affordability, dispatch,
/// bounded retry, escalation.
#[allow(clippy::too_many_lines)]
async fn process_chunk(
    ctx: &RunnerContext,
    guardrail: &CostGuardrail,
    router: &mut ModelRouter,
    index: usize,
    timeout_ms: u64,
    retry: &RetryConfig,
    learning_enabled: bool,
) -> ChunkOutcome {
    let (session_id, direction, temperature, chunk_id, file_path, stage, content) = {
        let mut state = ctx.state.lock();
        let chunk = &state.chunks[index];
        let fields = (
            state.meta.id.clone(),
            state.meta.direction,
            state.settings.ai.temperature,
            chunk.chunk_id.clone(),
            chunk.file_path.clone(),
            chunk.stage,
            chunk.content_in.clone(),
        );
        let stage = fields.5;
        state.mark_stage_running(stage);
        fields
    };
    let signature = fingerprint(&content);

    // A promoted learned pattern bypasses the router entirely: no
    // translator call, no cost.
    if learning_enabled {
        match ctx.store.promoted_pattern(&signature) {
            Ok(Some(pattern)) => {
                {
                    let mut state = ctx.state.lock();
                    state.chunks[index].mark_converted(pattern.replacement.clone(), None);
                    state.push_note(format!("Learned pattern applied to {file_path}"));
                    state.recompute_progress();
                }
                if let Err(err) = ctx.store.record_auto_attempt(&signature, true) {
                    warn!(error = %err, "failed to record pattern application");
                }
                debug!(chunk_id = %chunk_id, "chunk resolved by learned pattern");
                return ChunkOutcome::Processed;
            }
            Ok(None) => {}
            Err(err) => {
                return ChunkOutcome::Fatal(format!("pattern store unavailable: {err}"));
            }
        }
    }

    loop {
        // Ask the guardrail whether the active model can afford one more
        // unit, before dispatching.
        let est_tokens = estimate_tokens(&content);
        let model = router.active_model().to_owned();
        let est_cost = ctx.estimator.estimate_usd(&model, est_tokens);
        let check = {
            let state = ctx.state.lock();
            guardrail.check(&state.cost, est_cost)
        };

        if check == BudgetCheck::Exhausted {
            // Auto-switch retries the same chunk on the next model; switches
            // never count against the chunk's attempt count.
            if let Some(next_model) = router.switch_to_fallback() {
                let next_model = next_model.to_owned();
                let mut state = ctx.state.lock();
                state.cost.active_model = next_model.clone();
                state.cost.fallback_index = router.active_index();
                state.push_note(format!("Auto-switched to fallback model {next_model}"));
                continue;
            }
            return ChunkOutcome::BudgetExhausted;
        }

        let request = TranslateRequest {
            session_id: session_id.clone(),
            chunk_id: chunk_id.clone(),
            file_path: file_path.clone(),
            stage,
            content: content.clone(),
            direction,
            model: model.clone(),
            temperature,
        };
        let result = tokio::select! {
            result = translate_with_timeout(ctx.translator.as_ref(), request, timeout_ms) => result,
            () = ctx.cancel.cancelled() => return ChunkOutcome::Cancelled,
        };

        match result {
            Ok(outcome) => {
                // Cost is committed exactly once per attempt: actual usage
                // when reported, the estimate otherwise.
                let tokens = outcome.tokens.unwrap_or(est_tokens);
                let cost = outcome.cost_usd.unwrap_or(est_cost);
                let mut state = ctx.state.lock();
                guardrail.commit(&mut state.cost, tokens, cost);
                {
                    let chunk = &mut state.chunks[index];
                    chunk.tokens_used += tokens;
                    chunk.cost_usd += cost.max(0.0);
                    chunk.mark_converted(outcome.content, Some(model));
                }
                if let Some(note) = guardrail.warn_note(&mut state.cost) {
                    state.push_note(note);
                }
                state.recompute_progress();
                return ChunkOutcome::Processed;
            }
            Err(TranslateError::Cancelled) => return ChunkOutcome::Cancelled,
            Err(err) if err.is_retryable() => {
                // Failed attempts still consume budget.
                let attempts = {
                    let mut state = ctx.state.lock();
                    guardrail.commit(&mut state.cost, est_tokens, est_cost);
                    if let Some(note) = guardrail.warn_note(&mut state.cost) {
                        state.push_note(note);
                    }
                    let chunk = &mut state.chunks[index];
                    chunk.attempt_count += 1;
                    chunk.status = ChunkStatus::Failed;
                    chunk.last_error = Some(err.to_string());
                    chunk.tokens_used += est_tokens;
                    chunk.cost_usd += est_cost;
                    chunk.attempt_count
                };
                warn!(
                    chunk_id = %chunk_id,
                    attempt = attempts,
                    category = err.category(),
                    error = %err,
                    "translation attempt failed"
                );

                if attempts >= retry.max_retries.max(1) {
                    let mut state = ctx.state.lock();
                    state.enqueue_manual(
                        index,
                        ManualFixReason::TranslationFailed,
                        format!("Translation failed after {attempts} attempts: {err}"),
                    );
                    state.recompute_progress();
                    return ChunkOutcome::Processed;
                }

                let delay_ms = calculate_backoff_delay(
                    attempts - 1,
                    retry.base_delay_ms,
                    retry.max_delay_ms,
                    retry.jitter_factor,
                );
                tokio::select! {
                    () = tokio::time::sleep(std::time::Duration::from_millis(delay_ms)) => {}
                    () = ctx.cancel.cancelled() => return ChunkOutcome::Cancelled,
                }
            }
            Err(err @ TranslateError::Api { .. }) => {
                // Non-retryable rejection from the backend: escalate
                // immediately, no more retries for this chunk.
                let mut state = ctx.state.lock();
                guardrail.commit(&mut state.cost, est_tokens, est_cost);
                {
                    let chunk = &mut state.chunks[index];
                    chunk.attempt_count += 1;
                    chunk.last_error = Some(err.to_string());
                    chunk.tokens_used += est_tokens;
                    chunk.cost_usd += est_cost;
                }
                state.enqueue_manual(
                    index,
                    ManualFixReason::TranslationFailed,
                    format!("Translator rejected chunk: {err}"),
                );
                state.recompute_progress();
                return ChunkOutcome::Processed;
            }
            Err(err) => {
                // TranslateError::Other: an unrecoverable transport-level
                // failure talking to the translator.
                return ChunkOutcome::Fatal(format!("unrecoverable translator error: {err}"));
            }
        }
    }
}

/// Finalization: validation, QUALITY bookkeeping, completion or parking.
async fn finalize(ctx: &RunnerContext) {
    run_quality(ctx).await;
    if ctx.cancel.is_cancelled() {
        return;
    }

    {
        let mut state = ctx.state.lock();
        for chunk in &mut state.chunks {
            if chunk.stage == Stage::Quality && !chunk.status.is_terminal() {
                chunk.status = ChunkStatus::Converted;
            }
        }
        state.recompute_progress();
    }

    let blocked = { ctx.state.lock().pending_manual_count() > 0 };
    if blocked {
        park(ctx, PauseReason::AwaitingManualFixes).await;
        return;
    }

    {
        let mut state = ctx.state.lock();
        state.status = SessionStatus::Completed;
        state.pause_reason = None;
        info!(session_id = %state.meta.id, "session completed");
    }
    if checkpoint(ctx).is_err() {
        fail_session(ctx, "checkpoint write failed on completion").await;
        return;
    }
    fire_event(ctx, SessionEvent::Completed).await;
    run_backup(ctx).await;
}

/// Run the external validation capability once, bounded by the build
/// timeout. Non-blocking findings become notes; blocking findings enqueue
/// `validation_failed` manual fixes for the chunk owning the file.
async fn run_quality(ctx: &RunnerContext) {
    let Some(validator) = ctx.validator.clone() else {
        return;
    };
    let (target_path, timeout_secs) = {
        let state = ctx.state.lock();
        (
            state.meta.target_path.clone(),
            state.settings.performance.build_timeout_seconds,
        )
    };

    let report = tokio::select! {
        result = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            validator.validate(&target_path),
        ) => result.unwrap_or_else(|_| ValidationReport {
            passed: false,
            diagnostics: vec![crate::validate::Diagnostic {
                file_path: None,
                message: format!("validation timed out after {timeout_secs}s"),
                severity: DiagnosticSeverity::Warning,
            }],
        }),
        () = ctx.cancel.cancelled() => return,
    };

    let mut state = ctx.state.lock();
    state.push_note(if report.passed {
        "Validation passed".to_string()
    } else {
        "Validation completed with issues".to_string()
    });
    for diagnostic in report.diagnostics {
        state.push_note(format!("Validation issue: {}", diagnostic.message));
        if diagnostic.severity == DiagnosticSeverity::Blocking {
            if let Some(file_path) = &diagnostic.file_path {
                let owner = state.chunks.iter().position(|c| {
                    c.file_path == *file_path && c.status == ChunkStatus::Converted
                });
                if let Some(owner) = owner {
                    state.enqueue_manual(
                        owner,
                        ManualFixReason::ValidationFailed,
                        diagnostic.message.clone(),
                    );
                }
            }
        }
    }
    state.recompute_progress();
}

/// Post-completion backup hook. Never session-fatal.
async fn run_backup(ctx: &RunnerContext) {
    let Some(backup) = ctx.backup.clone() else {
        return;
    };
    let (enabled, session_id, target_path) = {
        let state = ctx.state.lock();
        (
            state.settings.backup.enabled,
            state.meta.id.as_str().to_owned(),
            state.meta.target_path.clone(),
        )
    };
    if !enabled {
        return;
    }

    match backup.store_backup(&session_id, &target_path).await {
        Ok(handle) => {
            ctx.state.lock().push_note(format!("Backup stored: {handle}"));
        }
        Err(err) => {
            warn!(session_id, error = %err, "backup failed");
            ctx.state.lock().push_note(format!("Backup failed: {err}"));
        }
    }
    if let Err(err) = checkpoint(ctx) {
        warn!(error = %err, "failed to checkpoint backup note");
    }
}

/// Park the session as `Paused` with the given reason.
async fn park(ctx: &RunnerContext, reason: PauseReason) {
    {
        let mut state = ctx.state.lock();
        state.status = SessionStatus::Paused;
        state.pause_reason = Some(reason);
        state.paused_at = Some(ferry_core::now_rfc3339());
        match reason {
            PauseReason::BudgetExhausted => {
                state.push_note(
                    "Budget exhausted with no fallback model remaining; raise the budget and resume"
                        .to_string(),
                );
            }
            PauseReason::AwaitingManualFixes => {
                let pending = state.pending_manual_count();
                state.push_note(format!(
                    "Waiting on {pending} manual fix(es) before completion"
                ));
            }
            PauseReason::Requested => {}
        }
        info!(session_id = %state.meta.id, ?reason, "session paused");
    }
    if checkpoint(ctx).is_err() {
        fail_session(ctx, "checkpoint write failed while pausing").await;
        return;
    }
    fire_event(ctx, SessionEvent::Paused).await;
}

/// Transition to `Failed`. Best-effort checkpoint; always recoverable via
/// resume-failed, which replays from the last durable snapshot.
async fn fail_session(ctx: &RunnerContext, message: &str) {
    {
        let mut state = ctx.state.lock();
        state.status = SessionStatus::Failed;
        state.pause_reason = None;
        state.push_note(format!("Session failed: {message}"));
        error!(session_id = %state.meta.id, message, "session failed");
    }
    if let Err(err) = checkpoint(ctx) {
        error!(error = %err, "failed to checkpoint failed session");
    }
    fire_event(ctx, SessionEvent::Failed).await;
}

/// Persist the current state. Called after every chunk and status
/// transition.
fn checkpoint(ctx: &RunnerContext) -> Result<(), ferry_store::StoreError> {
    let snapshot = { ctx.state.lock().to_snapshot() };
    ctx.store.upsert_snapshot(&snapshot)
}

/// Whether a stage has reached terminal status.
fn stage_complete(ctx: &RunnerContext, stage: Stage) -> bool {
    let state = ctx.state.lock();
    state
        .stage_progress
        .get(&stage)
        .is_some_and(|p| p.status == StageStatus::Completed)
}

/// Fire a lifecycle event to all subscribed webhooks. Delivery failures
/// are the dispatcher's problem, never the session's.
async fn fire_event(ctx: &RunnerContext, event: SessionEvent) {
    let payload = {
        let state = ctx.state.lock();
        EventPayload::new(event, state.summary())
    };
    let configs = match ctx.store.list_webhooks() {
        Ok(configs) => configs,
        Err(err) => {
            warn!(error = %err, "failed to load webhook configs");
            return;
        }
    };
    if configs.is_empty() {
        return;
    }
    let _ = ctx.dispatcher.dispatch(&configs, event, &payload).await;
}
