//! Work planning.
//!
//! A [`WorkPlan`] is the output of project detection (external): every
//! chunk the conversion will process, grouped by stage. Chunk order within
//! a stage is insertion order and is never re-sorted — resume determinism
//! depends on it.

use ferry_core::{Chunk, ChunkId, Stage};

/// The planned chunks for one session.
#[derive(Clone, Debug, Default)]
pub struct WorkPlan {
    chunks: Vec<Chunk>,
}

impl WorkPlan {
    /// An empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk to the plan. Returns its generated id.
    pub fn add_chunk(
        &mut self,
        file_path: impl Into<String>,
        stage: Stage,
        content: impl Into<String>,
    ) -> ChunkId {
        let chunk = Chunk::new(file_path, stage, content);
        let id = chunk.chunk_id.clone();
        self.chunks.push(chunk);
        id
    }

    /// Number of planned chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Consume the plan, yielding chunks in plan order.
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Provides a work plan for a project — the seam to external detection.
pub trait Planner: Send + Sync {
    /// Build the work plan for the project at `source_path`.
    fn plan(&self, source_path: &str, direction: ferry_core::Direction) -> WorkPlan;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_preserves_insertion_order() {
        let mut plan = WorkPlan::new();
        let _ = plan.add_chunk("b.swift", Stage::Code, "b");
        let _ = plan.add_chunk("a.swift", Stage::Code, "a");
        let _ = plan.add_chunk("icons.xcassets", Stage::Resources, "assets");

        let chunks = plan.into_chunks();
        let paths: Vec<_> = chunks.iter().map(|c| c.file_path.as_str()).collect();
        // Plan order, not alphabetical and not stage order.
        assert_eq!(paths, vec!["b.swift", "a.swift", "icons.xcassets"]);
    }

    #[test]
    fn empty_plan() {
        let plan = WorkPlan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
