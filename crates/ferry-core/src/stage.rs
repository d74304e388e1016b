//! Conversion stages and per-stage progress.
//!
//! A conversion runs through a fixed sequence of named stages. Chunks are
//! grouped by stage, and a stage is not entered until every chunk of every
//! prior stage has reached a terminal status.

use serde::{Deserialize, Serialize};

/// A named conversion stage.
///
/// The order of [`STAGE_ORDER`] is the processing order; it never changes
/// between runs, which keeps resume deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Asset and resource conversion (images, localization bundles).
    Resources,
    /// Dependency manifest generation.
    Dependencies,
    /// Target project scaffolding.
    ProjectSetup,
    /// Source code translation — the bulk of the work.
    Code,
    /// Test translation and toolchain validation.
    Tests,
    /// Final quality pass over the converted project.
    Quality,
}

/// The fixed processing order of stages.
pub const STAGE_ORDER: [Stage; 6] = [
    Stage::Resources,
    Stage::Dependencies,
    Stage::ProjectSetup,
    Stage::Code,
    Stage::Tests,
    Stage::Quality,
];

impl Stage {
    /// Stable string form, used in SQL and webhook payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resources => "RESOURCES",
            Self::Dependencies => "DEPENDENCIES",
            Self::ProjectSetup => "PROJECT_SETUP",
            Self::Code => "CODE",
            Self::Tests => "TESTS",
            Self::Quality => "QUALITY",
        }
    }

    /// Parse from the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESOURCES" => Some(Self::Resources),
            "DEPENDENCIES" => Some(Self::Dependencies),
            "PROJECT_SETUP" => Some(Self::ProjectSetup),
            "CODE" => Some(Self::Code),
            "TESTS" => Some(Self::Tests),
            "QUALITY" => Some(Self::Quality),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not yet entered.
    Pending,
    /// Currently processing chunks.
    Running,
    /// Every chunk has reached a terminal status.
    Completed,
}

/// Progress counters for one stage.
///
/// `total_units` is fixed at plan time; `completed_units` counts chunks
/// whose status is `converted` or `skipped`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    /// The stage these counters belong to.
    pub stage: Stage,
    /// Chunks converted or skipped.
    pub completed_units: u32,
    /// Chunks planned into this stage. Immutable after planning.
    pub total_units: u32,
    /// Stage status.
    pub status: StageStatus,
}

impl StageProgress {
    /// A fresh pending stage with the given unit count.
    #[must_use]
    pub fn new(stage: Stage, total_units: u32) -> Self {
        Self {
            stage,
            completed_units: 0,
            total_units,
            status: StageStatus::Pending,
        }
    }

    /// Completion fraction in `[0.0, 1.0]`.
    ///
    /// An empty stage is vacuously complete (`1.0`), which also avoids
    /// division by zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // unit counts never approach 2^52
    pub fn percentage(&self) -> f64 {
        if self.total_units == 0 {
            return 1.0;
        }
        (f64::from(self.completed_units) / f64::from(self.total_units)).min(1.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
