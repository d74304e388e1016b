//! # ferry-engine
//!
//! The conversion session orchestrator: session state machines, the stage
//! pipeline, the manual fix queue with pattern learning, checkpoint-backed
//! resume, webhook notification, and batch scheduling.
//!
//! The [`Orchestrator`] is the public surface. It composes the collaborator
//! seams — [`Translator`] for the AI boundary, [`Planner`] for project
//! detection, [`Validator`] for the toolchain, [`BackupStore`] for
//! archival — with the persistence and delivery crates.
//!
//! Each session is logically single-threaded: one chunk at a time, in
//! stage/plan order, with a checkpoint after every transition. Multiple
//! sessions run concurrently, bounded by the configured
//! `parallel_conversions` admission gate.
//!
//! [`Translator`]: ferry_router::Translator

#![deny(unsafe_code)]

mod batch;
mod errors;
mod manual;
mod orchestrator;
mod pipeline;
mod session;
mod state;
mod validate;

pub use batch::BatchQueueEntry;
pub use errors::{EngineError, Result};
pub use manual::AppliedFix;
pub use orchestrator::{Orchestrator, OrchestratorOptions, StartSessionRequest};
pub use pipeline::{Planner, WorkPlan};
pub use state::SessionState;
pub use validate::{
    BackupStore, Diagnostic, DiagnosticSeverity, ValidationReport, Validator,
};
