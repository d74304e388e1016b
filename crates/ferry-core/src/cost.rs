//! Per-session spend ledger.

use serde::{Deserialize, Serialize};

/// Running token/cost totals for one session.
///
/// `cost_usd` is monotonically non-decreasing: spend is committed exactly
/// once per translation attempt and never rolled back. Budget exhaustion is
/// detected prospectively, before dispatch, not by clawing back spend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostState {
    /// Total tokens consumed.
    pub tokens_used: u64,
    /// Total spend in USD.
    pub cost_usd: f64,
    /// Model currently selected for dispatch.
    pub active_model: String,
    /// How far down the fallback chain the session has switched
    /// (0 = primary model).
    pub fallback_index: usize,
    /// Whether the warn-threshold note has been emitted.
    pub warned: bool,
}

impl CostState {
    /// A fresh ledger for the given primary model.
    #[must_use]
    pub fn new(active_model: impl Into<String>) -> Self {
        Self {
            tokens_used: 0,
            cost_usd: 0.0,
            active_model: active_model.into(),
            fallback_index: 0,
            warned: false,
        }
    }

    /// Commit one attempt's usage. Negative costs are clamped to zero so the
    /// ledger can never decrease.
    pub fn charge(&mut self, tokens: u64, cost_usd: f64) {
        self.tokens_used += tokens;
        self.cost_usd += cost_usd.max(0.0);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
