//! End-to-end orchestrator tests with scripted collaborators.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use ferry_core::retry::RetryConfig;
use ferry_core::{
    Direction, ManualFixReason, PauseReason, SessionStatus, SessionSummary, Stage, WebhookConfig,
};
use ferry_engine::{
    BatchQueueEntry, Diagnostic, DiagnosticSeverity, EngineError, Orchestrator,
    OrchestratorOptions, Planner, StartSessionRequest, ValidationReport, Validator, WorkPlan,
};
use ferry_router::{
    CostEstimator, TranslateError, TranslateRequest, TranslationOutcome, Translator,
};
use ferry_settings::FerrySettings;
use ferry_store::Store;

// ─────────────────────────────────────────────────────────────────────────────
// Scripted collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Planner returning a fixed chunk list.
struct StaticPlanner(Vec<(String, Stage, String)>);

impl Planner for StaticPlanner {
    fn plan(&self, _source_path: &str, _direction: Direction) -> WorkPlan {
        let mut plan = WorkPlan::new();
        for (file_path, stage, content) in &self.0 {
            let _ = plan.add_chunk(file_path.clone(), *stage, content.clone());
        }
        plan
    }
}

fn ok_outcome(request: &TranslateRequest, cost: f64) -> TranslationOutcome {
    TranslationOutcome {
        content: format!("converted {}", request.file_path),
        tokens: Some(100),
        cost_usd: Some(cost),
    }
}

/// Succeeds on every chunk at a fixed reported cost.
struct OkTranslator {
    calls: Arc<AtomicU32>,
    cost: f64,
}

#[async_trait]
impl Translator for OkTranslator {
    async fn translate(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ok_outcome(&request, self.cost))
    }
}

/// Always fails a specific file with a retryable server error.
struct FailingTranslator {
    fail_file: String,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.file_path == self.fail_file {
            Err(TranslateError::Api {
                status: 500,
                message: "model stalled".to_string(),
                retryable: true,
            })
        } else {
            Ok(ok_outcome(&request, 0.01))
        }
    }
}

/// Blocks each call until the test releases a permit.
struct GatedTranslator {
    gate: Arc<Semaphore>,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Translator for GatedTranslator {
    async fn translate(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        let permit = self.gate.acquire().await.map_err(|_| TranslateError::Cancelled)?;
        permit.forget();
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ok_outcome(&request, 0.01))
    }
}

/// Reports cost by model: expensive on the primary, free on the fallback.
struct TieredTranslator {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Translator for TieredTranslator {
    async fn translate(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        let cost = if request.model == "cheap-model" { 0.0 } else { 0.6 };
        Ok(ok_outcome(&request, cost))
    }
}

/// Flat estimate per chunk regardless of model.
struct FlatEstimator(f64);

impl CostEstimator for FlatEstimator {
    fn estimate_usd(&self, _model: &str, _tokens: u64) -> f64 {
        self.0
    }
}

/// Expensive on the primary model, free on the fallback.
struct TieredEstimator;

impl CostEstimator for TieredEstimator {
    fn estimate_usd(&self, model: &str, _tokens: u64) -> f64 {
        if model == "cheap-model" { 0.0 } else { 0.6 }
    }
}

/// Flags one file as blocking.
struct BlockingValidator {
    bad_file: String,
}

#[async_trait]
impl Validator for BlockingValidator {
    async fn validate(&self, _target_path: &str) -> ValidationReport {
        ValidationReport {
            passed: false,
            diagnostics: vec![Diagnostic {
                file_path: Some(self.bad_file.clone()),
                message: "build error in converted output".to_string(),
                severity: DiagnosticSeverity::Blocking,
            }],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

fn fast_settings() -> FerrySettings {
    let mut settings = FerrySettings::default();
    settings.retry = RetryConfig {
        max_retries: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter_factor: 0.0,
    };
    settings.ai.translate_timeout_ms = 60_000;
    settings.delivery.base_delay_ms = 1;
    settings
}

fn code_chunks(n: usize) -> Vec<(String, Stage, String)> {
    (0..n)
        .map(|i| {
            (
                format!("src/f{i}.swift"),
                Stage::Code,
                format!("class F{i} {{}}"),
            )
        })
        .collect()
}

fn build_orchestrator(
    db_path: &std::path::Path,
    translator: Arc<dyn Translator>,
    chunks: Vec<(String, Stage, String)>,
    settings: FerrySettings,
    estimator: Option<Arc<dyn CostEstimator>>,
    validator: Option<Arc<dyn Validator>>,
) -> Orchestrator {
    let store = Arc::new(Store::open(db_path).unwrap());
    Orchestrator::new(OrchestratorOptions {
        store,
        planner: Arc::new(StaticPlanner(chunks)),
        translator,
        validator,
        backup: None,
        estimator,
        defaults: settings,
    })
    .unwrap()
}

fn start(orchestrator: &Orchestrator) -> String {
    orchestrator
        .start_session(StartSessionRequest {
            source_path: "/projects/app".to_string(),
            target_path: "/projects/app-win".to_string(),
            direction: Direction::MacToWin,
            settings: None,
        })
        .unwrap()
        .into_inner()
}

async fn wait_for(
    orchestrator: &Orchestrator,
    session_id: &str,
    pred: impl Fn(&SessionSummary) -> bool,
) -> SessionSummary {
    for _ in 0..500 {
        let summary = orchestrator.get_status(session_id).unwrap();
        if pred(&summary) {
            return summary;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "condition not reached, last status: {:?}",
        orchestrator.get_status(session_id)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_completes_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let mut chunks = vec![(
        "assets.xcassets".to_string(),
        Stage::Resources,
        "asset bundle".to_string(),
    )];
    chunks.extend(code_chunks(2));

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: calls.clone(),
            cost: 0.01,
        }),
        chunks,
        fast_settings(),
        None,
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert!((summary.overall_percentage - 1.0).abs() < f64::EPSILON);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!((summary.cost.cost_usd - 0.03).abs() < 1e-9);
    assert_eq!(summary.stage_progress[&Stage::Code].completed_units, 2);
    assert_eq!(summary.manual_fixes_pending, 0);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.01,
        }),
        code_chunks(1),
        fast_settings(),
        None,
        None,
    );
    let err = orchestrator.get_status("sess-missing").unwrap_err();
    assert!(matches!(err, EngineError::SessionNotFound(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry and manual escalation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_chunk_escalates_after_retry_limit() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let mut chunks = code_chunks(1);
    chunks.push((
        "src/bad.swift".to_string(),
        Stage::Code,
        "class Bad {}".to_string(),
    ));

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(FailingTranslator {
            fail_file: "src/bad.swift".to_string(),
            calls: calls.clone(),
        }),
        chunks,
        fast_settings(),
        None,
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Paused);
    assert_eq!(summary.pause_reason, Some(PauseReason::AwaitingManualFixes));
    // 1 success + 3 bounded attempts on the failing chunk.
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let fixes = orchestrator.list_manual_fixes(&session_id).unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].reason, ManualFixReason::TranslationFailed);
    assert_eq!(fixes[0].file_path, "src/bad.swift");

    // Human resolves the chunk; resume completes the session.
    let chunk_id = fixes[0].chunk_id.as_str().to_owned();
    orchestrator
        .apply_manual_fix(&session_id, &chunk_id, "fixed by hand", None, Some("sam"))
        .unwrap();
    orchestrator.resume_session(&session_id).unwrap();
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    // The fixed chunk was not re-translated.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn apply_manual_fix_requires_pending_entry() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.01,
        }),
        code_chunks(1),
        fast_settings(),
        None,
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let err = orchestrator
        .apply_manual_fix(&session_id, "chunk-none", "content", None, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::ManualFixNotPending(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Budget enforcement
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn budget_exhaustion_without_fallback_pauses() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let mut settings = fast_settings();
    settings.cost.max_usd = 1.0;
    settings.cost.fallback_chain = Vec::new();

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: calls.clone(),
            cost: 0.6,
        }),
        code_chunks(3),
        settings,
        Some(Arc::new(FlatEstimator(0.6))),
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Paused);
    assert_eq!(summary.pause_reason, Some(PauseReason::BudgetExhausted));
    // Chunk 1 dispatched and charged; chunk 2 was stopped prospectively.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!((summary.cost.cost_usd - 0.6).abs() < 1e-9);
    assert_eq!(summary.stage_progress[&Stage::Code].completed_units, 1);

    // Raising the budget and resuming finishes the session without
    // redoing chunk 1.
    let mut raised = fast_settings();
    raised.cost.max_usd = 10.0;
    orchestrator
        .resume_session_with_settings(&session_id, raised)
        .unwrap();
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!((summary.cost.cost_usd - 1.8).abs() < 1e-9);
}

#[tokio::test]
async fn budget_exhaustion_switches_to_fallback_and_completes() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let mut settings = fast_settings();
    settings.cost.max_usd = 1.0;
    settings.cost.fallback_chain = vec!["cheap-model".to_string()];

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(TieredTranslator { calls: calls.clone() }),
        code_chunks(3),
        settings,
        Some(Arc::new(TieredEstimator)),
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(summary.cost.active_model, "cheap-model");
    assert_eq!(summary.cost.fallback_index, 1);
    assert!(summary
        .notes
        .iter()
        .any(|n| n.contains("fallback model cheap-model")));
    // All three chunks translated; the switch retried the same chunk.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!((summary.cost.cost_usd - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn exhausted_fallback_chain_still_pauses() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = fast_settings();
    settings.cost.max_usd = 1.0;
    settings.cost.fallback_chain = vec!["also-expensive".to_string()];

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.6,
        }),
        code_chunks(2),
        settings,
        Some(Arc::new(FlatEstimator(0.6))),
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Paused);
    assert_eq!(summary.pause_reason, Some(PauseReason::BudgetExhausted));
    // The whole chain was walked before pausing.
    assert_eq!(summary.cost.fallback_index, 1);
    assert!(summary.notes.iter().any(|n| n.contains("also-expensive")));
}

// ─────────────────────────────────────────────────────────────────────────────
// Pause / resume
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pause_takes_effect_at_chunk_boundary_and_resume_redoes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let gate = Arc::new(Semaphore::new(0));

    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(GatedTranslator {
            gate: gate.clone(),
            calls: calls.clone(),
        }),
        code_chunks(4),
        fast_settings(),
        None,
        None,
    );

    let session_id = start(&orchestrator);

    // Let chunk 1 finish, then request a pause while chunk 2 is in flight.
    gate.add_permits(1);
    let _ = wait_for(&orchestrator, &session_id, |s| {
        s.stage_progress[&Stage::Code].completed_units == 1
    })
    .await;
    orchestrator.pause_session(&session_id).unwrap();
    gate.add_permits(1);
    orchestrator.join_session(&session_id).await.unwrap();

    let paused = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.pause_reason, Some(PauseReason::Requested));
    // The in-flight chunk was allowed to finish; pause landed at the boundary.
    assert_eq!(paused.stage_progress[&Stage::Code].completed_units, 2);
    let cost_at_pause = paused.cost.cost_usd;

    // Resume processes only the remaining chunks.
    orchestrator.resume_session(&session_id).unwrap();
    gate.add_permits(2);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!((summary.cost.cost_usd - cost_at_pause - 0.02).abs() < 1e-9);
}

#[tokio::test]
async fn resume_from_checkpoint_after_restart_redoes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ferry.db");
    let calls = Arc::new(AtomicU32::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let chunks = code_chunks(2);

    let session_id;
    let cost_at_pause;
    {
        let orchestrator = build_orchestrator(
            &db_path,
            Arc::new(GatedTranslator {
                gate: gate.clone(),
                calls: calls.clone(),
            }),
            chunks.clone(),
            fast_settings(),
            None,
            None,
        );
        session_id = start(&orchestrator);
        gate.add_permits(1);
        let _ = wait_for(&orchestrator, &session_id, |s| {
            s.stage_progress[&Stage::Code].completed_units == 1
        })
        .await;
        orchestrator.pause_session(&session_id).unwrap();
        gate.add_permits(1);
        orchestrator.join_session(&session_id).await.unwrap();
        cost_at_pause = orchestrator.get_status(&session_id).unwrap().cost.cost_usd;
        // Orchestrator dropped here: simulated process exit.
    }

    let orchestrator = build_orchestrator(
        &db_path,
        Arc::new(GatedTranslator {
            gate: gate.clone(),
            calls: calls.clone(),
        }),
        chunks,
        fast_settings(),
        None,
        None,
    );

    // Status is readable straight from the checkpoint.
    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Paused);
    assert!((summary.cost.cost_usd - cost_at_pause).abs() < 1e-9);

    orchestrator.resume_session(&session_id).unwrap();
    gate.add_permits(8);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    // No chunk was re-processed and no cost double-counted.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!((summary.cost.cost_usd - 0.02).abs() < 1e-9);
}

#[tokio::test]
async fn failed_session_recovers_via_resume_failed() {
    use std::sync::atomic::AtomicBool;

    /// Fails the first call with an unrecoverable error, then succeeds.
    struct FlakyTransport {
        tripped: AtomicBool,
        calls: Arc<AtomicU32>,
    }
    #[async_trait]
    impl Translator for FlakyTransport {
        async fn translate(
            &self,
            request: TranslateRequest,
        ) -> Result<TranslationOutcome, TranslateError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(TranslateError::Other {
                    message: "translator endpoint unreachable".to_string(),
                });
            }
            Ok(ok_outcome(&request, 0.01))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(FlakyTransport {
            tripped: AtomicBool::new(false),
            calls: calls.clone(),
        }),
        code_chunks(2),
        fast_settings(),
        None,
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Failed);
    assert!(summary.notes.iter().any(|n| n.contains("Session failed")));

    // Plain resume is rejected for a failed session.
    let err = orchestrator.resume_session(&session_id).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    // Resume-failed replays from the last checkpoint and completes.
    orchestrator.resume_failed_session(&session_id).unwrap();
    orchestrator.join_session(&session_id).await.unwrap();
    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    // One failed call plus one successful call per chunk.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn resume_requires_paused_status() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.01,
        }),
        code_chunks(1),
        fast_settings(),
        None,
        None,
    );
    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let err = orchestrator.resume_session(&session_id).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Learned patterns
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_identical_fixes_promote_and_auto_apply() {
    struct AlwaysFails {
        calls: Arc<AtomicU32>,
    }
    #[async_trait]
    impl Translator for AlwaysFails {
        async fn translate(
            &self,
            _request: TranslateRequest,
        ) -> Result<TranslationOutcome, TranslateError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TranslateError::Transport {
                message: "connection reset".to_string(),
            })
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let mut settings = fast_settings();
    settings.retry.max_retries = 1;
    settings.conversion.learning_trigger_count = 3;

    // Four chunks with identical content: all escalate on first failure.
    let chunks: Vec<_> = (0..4)
        .map(|i| {
            (
                format!("src/view{i}.swift"),
                Stage::Code,
                "NSView setNeedsDisplay".to_string(),
            )
        })
        .collect();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(AlwaysFails { calls: calls.clone() }),
        chunks,
        settings,
        None,
        None,
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let fixes = orchestrator.list_manual_fixes(&session_id).unwrap();
    assert_eq!(fixes.len(), 4);
    let calls_before = calls.load(Ordering::SeqCst);

    // Apply the same replacement to three of them: promotion threshold hit.
    for entry in fixes.iter().take(3) {
        orchestrator
            .apply_manual_fix(
                &session_id,
                entry.chunk_id.as_str(),
                "Control.Invalidate()",
                Some("use WinForms invalidation"),
                Some("sam"),
            )
            .unwrap();
    }

    // The fourth resolves automatically, without invoking the translator.
    let applied = orchestrator.apply_learned_patterns(&session_id).unwrap();
    assert_eq!(applied, 1);
    assert_eq!(calls.load(Ordering::SeqCst), calls_before);

    let fixes = orchestrator.list_manual_fixes(&session_id).unwrap();
    assert!(fixes.is_empty());

    orchestrator.resume_session(&session_id).unwrap();
    orchestrator.join_session(&session_id).await.unwrap();
    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), calls_before);
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn blocking_validation_issue_enqueues_manual_fix() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.01,
        }),
        code_chunks(2),
        fast_settings(),
        None,
        Some(Arc::new(BlockingValidator {
            bad_file: "src/f1.swift".to_string(),
        })),
    );

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let summary = orchestrator.get_status(&session_id).unwrap();
    assert_eq!(summary.status, SessionStatus::Paused);
    assert_eq!(summary.pause_reason, Some(PauseReason::AwaitingManualFixes));
    assert!(summary
        .notes
        .iter()
        .any(|n| n.contains("Validation issue")));

    let fixes = orchestrator.list_manual_fixes(&session_id).unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].reason, ManualFixReason::ValidationFailed);
    assert_eq!(fixes[0].file_path, "src/f1.swift");

    // Skipping the flagged chunk unblocks completion.
    orchestrator
        .skip_manual_fix(&session_id, fixes[0].chunk_id.as_str(), Some("accepted as-is"))
        .unwrap();
    orchestrator.resume_session(&session_id).unwrap();
    orchestrator.join_session(&session_id).await.unwrap();
    assert_eq!(
        orchestrator.get_status(&session_id).unwrap().status,
        SessionStatus::Completed
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhooks
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_events_reach_registered_webhook() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: Arc::new(AtomicU32::new(0)),
            cost: 0.01,
        }),
        code_chunks(1),
        fast_settings(),
        None,
        None,
    );
    orchestrator
        .register_webhook(&WebhookConfig::for_url(format!("{}/hook", server.uri())))
        .unwrap();

    let session_id = start(&orchestrator);
    orchestrator.join_session(&session_id).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let events: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.headers
                .get("X-Webhook-Event")
                .map(|v| v.to_str().unwrap_or_default().to_owned())
        })
        .collect();
    assert!(events.contains(&"session.started".to_string()));
    assert!(events.contains(&"session.stage_completed".to_string()));
    assert!(events.contains(&"session.completed".to_string()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_returns_ids_immediately_and_all_sessions_finish() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let orchestrator = build_orchestrator(
        &dir.path().join("ferry.db"),
        Arc::new(OkTranslator {
            calls: calls.clone(),
            cost: 0.01,
        }),
        code_chunks(2),
        fast_settings(),
        None,
        None,
    );

    let ids = orchestrator
        .start_batch(
            vec![
                BatchQueueEntry {
                    source_path: "/projects/a".to_string(),
                    target_path: "/projects/a-win".to_string(),
                    direction: Direction::MacToWin,
                },
                BatchQueueEntry {
                    source_path: "/projects/b".to_string(),
                    target_path: "/projects/b-win".to_string(),
                    direction: Direction::MacToWin,
                },
            ],
            None,
        )
        .unwrap();
    assert_eq!(ids.len(), 2);

    for id in &ids {
        orchestrator.join_session(id.as_str()).await.unwrap();
        let _ = wait_for(&orchestrator, id.as_str(), |s| {
            s.status == SessionStatus::Completed
        })
        .await;
    }
    // Two sessions × two chunks each.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
