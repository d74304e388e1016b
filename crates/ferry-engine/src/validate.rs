//! Toolchain validation boundary.
//!
//! The QUALITY stage invokes this capability once against the target
//! project. Implementors wrap the real toolchain (`dotnet build`,
//! `swift build`); the engine only consumes pass/fail plus diagnostics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity of a validation diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    /// Informational only.
    Info,
    /// Reported in session notes, never blocks completion.
    Warning,
    /// Enqueues a `validation_failed` manual fix for the owning chunk.
    Blocking,
}

/// One validation finding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file the finding maps back to, when known.
    pub file_path: Option<String>,
    /// Finding description.
    pub message: String,
    /// Severity.
    pub severity: DiagnosticSeverity,
}

/// Result of validating the target project.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the toolchain pass succeeded overall.
    pub passed: bool,
    /// Individual findings.
    pub diagnostics: Vec<Diagnostic>,
}

/// The validate capability.
///
/// Infallible by contract: implementors fold their own errors into a
/// failed report. The engine bounds the call with the configured build
/// timeout.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validate the converted project at `target_path`.
    async fn validate(&self, target_path: &str) -> ValidationReport;
}

/// The backup capability: archive the target project, returning a storage
/// handle. Failures at this boundary are logged, never session-fatal.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Store a backup of `target_path` for the given session.
    async fn store_backup(&self, session_id: &str, target_path: &str) -> Result<String, String>;
}
