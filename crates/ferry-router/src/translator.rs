//! # Translator Trait
//!
//! Core abstraction for the translate capability. The engine hands a chunk
//! and a model to an implementor and gets back translated content plus
//! usage, or a classified failure. Translator-specific retry policy (e.g.
//! anti-stall re-prompting) is hidden behind this seam — the engine only
//! distinguishes retryable from terminal failures.

use async_trait::async_trait;

use ferry_core::{ChunkId, Direction, SessionId, Stage};

/// Result type alias for translator operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// One translation request.
#[derive(Clone, Debug)]
pub struct TranslateRequest {
    /// Session the chunk belongs to.
    pub session_id: SessionId,
    /// Chunk being translated.
    pub chunk_id: ChunkId,
    /// Source file, for context.
    pub file_path: String,
    /// Stage the chunk belongs to.
    pub stage: Stage,
    /// Content to translate.
    pub content: String,
    /// Conversion direction.
    pub direction: Direction,
    /// Model to invoke.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Successful translation output.
#[derive(Clone, Debug)]
pub struct TranslationOutcome {
    /// Translated content.
    pub content: String,
    /// Tokens consumed, if the backend reported them.
    pub tokens: Option<u64>,
    /// Actual cost in USD, if the backend reported it. When absent the
    /// guardrail commits the estimate instead.
    pub cost_usd: Option<f64>,
}

/// Errors that can occur during translation.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The call exceeded the configured timeout.
    #[error("translation timed out after {elapsed_ms}ms")]
    Timeout {
        /// How long the engine waited.
        elapsed_ms: u64,
    },

    /// Transport-level failure reaching the backend.
    #[error("transport error: {message}")]
    Transport {
        /// Error description.
        message: String,
    },

    /// The backend returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP-style status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// The call was cancelled.
    #[error("translation cancelled")]
    Cancelled,

    /// Backend-specific terminal error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl TranslateError {
    /// Whether this error is retryable.
    ///
    /// Timeouts and transport failures retry (bounded); API errors carry
    /// their own flag; cancellation and terminal errors never retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Cancelled | Self::Other { .. } => false,
        }
    }

    /// Error category string for logging and notes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "other",
        }
    }
}

/// The translate capability.
///
/// Implementors must be `Send + Sync`; the engine shares one translator
/// across concurrently running sessions.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one chunk with the given model.
    async fn translate(&self, request: TranslateRequest) -> TranslateResult<TranslationOutcome>;
}

/// Invoke a translator under a timeout.
///
/// A timeout is reported as [`TranslateError::Timeout`], which is retryable —
/// the same path as any other transient translator failure. No call blocks
/// the processing loop indefinitely.
pub async fn translate_with_timeout(
    translator: &dyn Translator,
    request: TranslateRequest,
    timeout_ms: u64,
) -> TranslateResult<TranslationOutcome> {
    match tokio::time::timeout(
        std::time::Duration::from_millis(timeout_ms),
        translator.translate(request),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(TranslateError::Timeout {
            elapsed_ms: timeout_ms,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
