//! Store error types.
//!
//! Any failure here is session-fatal at the engine layer: a session that
//! cannot checkpoint transitions to `Failed` (and is recoverable via
//! resume-failed once the store is healthy again).

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool exhausted or unavailable.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A persisted JSON column failed to (de)serialize.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Lookup by key found nothing.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind, e.g. `"session snapshot"`.
        entity: &'static str,
        /// The missing key.
        key: String,
    },
}

impl StoreError {
    /// Shorthand for a missing-key error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}
