//! # ferry-core
//!
//! Foundation types and utilities for the Ferry conversion engine.
//!
//! This crate provides the shared vocabulary that all other Ferry crates
//! depend on:
//!
//! - **Branded IDs**: `SessionId`, `ChunkId` as prefixed UUID v7 newtypes
//! - **Stages**: the fixed conversion stage order and per-stage progress
//! - **Chunks**: the unit of translation work and its status lifecycle
//! - **Sessions**: status, direction, and pause-reason enums
//! - **Cost**: the per-session spend ledger
//! - **Manual fixes**: entries escalated for human resolution
//! - **Events**: webhook event names and status summaries
//! - **Signatures**: content fingerprints for pattern learning
//! - **Retry**: backoff configuration and calculation

#![deny(unsafe_code)]

pub mod chunk;
pub mod cost;
pub mod events;
pub mod ids;
pub mod logging;
pub mod manual;
pub mod retry;
pub mod session;
pub mod signature;
pub mod stage;
pub mod webhook;

pub use chunk::{Chunk, ChunkStatus};
pub use cost::CostState;
pub use events::{EventPayload, SessionEvent, SessionSummary};
pub use ids::{ChunkId, SessionId};
pub use manual::{ManualFixEntry, ManualFixReason, ManualFixStatus};
pub use session::{Direction, PauseReason, SessionMeta, SessionStatus};
pub use signature::fingerprint;
pub use stage::{Stage, StageProgress, StageStatus, STAGE_ORDER};
pub use webhook::WebhookConfig;

/// Current UTC timestamp as an RFC 3339 string.
#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
