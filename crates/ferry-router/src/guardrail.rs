//! Budget enforcement.
//!
//! The guardrail answers one question before every dispatch — "can the
//! active model afford one more unit?" — and commits usage after. It never
//! rolls back committed spend; budget exhaustion is detected prospectively,
//! not by clawing back.

use ferry_core::CostState;
use tracing::debug;

/// Outcome of a prospective affordability check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetCheck {
    /// The estimated attempt fits inside the budget.
    Affordable,
    /// The estimated attempt would cross the budget.
    Exhausted,
}

/// Per-session budget guardrail.
///
/// Holds the immutable budget settings; the mutable ledger lives in
/// [`CostState`] so it checkpoints with the session.
#[derive(Clone, Debug)]
pub struct CostGuardrail {
    enabled: bool,
    max_usd: f64,
    warn_fraction: f64,
}

impl CostGuardrail {
    /// Build a guardrail from budget settings.
    #[must_use]
    pub fn new(enabled: bool, max_usd: f64, warn_fraction: f64) -> Self {
        Self {
            enabled,
            max_usd,
            warn_fraction,
        }
    }

    /// Prospective check: would committing `estimate_usd` cross the budget?
    ///
    /// Disabled guardrails and non-positive budgets never exhaust.
    #[must_use]
    pub fn check(&self, state: &CostState, estimate_usd: f64) -> BudgetCheck {
        if !self.enabled || self.max_usd <= 0.0 {
            return BudgetCheck::Affordable;
        }
        if state.cost_usd + estimate_usd > self.max_usd {
            debug!(
                spent = state.cost_usd,
                estimate = estimate_usd,
                budget = self.max_usd,
                "budget exhausted"
            );
            BudgetCheck::Exhausted
        } else {
            BudgetCheck::Affordable
        }
    }

    /// Commit one attempt's usage into the ledger.
    ///
    /// Called exactly once per translator invocation, success or failure.
    pub fn commit(&self, state: &mut CostState, tokens: u64, cost_usd: f64) {
        state.charge(tokens, cost_usd);
    }

    /// Warn-threshold note, produced at most once per session.
    ///
    /// Returns the note text the first time consumed spend crosses the warn
    /// fraction; marks the ledger so later calls return `None`.
    pub fn warn_note(&self, state: &mut CostState) -> Option<String> {
        if !self.enabled || self.max_usd <= 0.0 || state.warned {
            return None;
        }
        let consumed = state.cost_usd / self.max_usd;
        if consumed >= self.warn_fraction {
            state.warned = true;
            Some(format!(
                "Cost budget at {:.0}% (${:.2} / ${:.2})",
                consumed * 100.0,
                state.cost_usd,
                self.max_usd
            ))
        } else {
            None
        }
    }

    /// Fraction of the budget consumed, capped at 10x for display.
    #[must_use]
    pub fn percent_consumed(&self, state: &CostState) -> f64 {
        if !self.enabled || self.max_usd <= 0.0 {
            return 0.0;
        }
        (state.cost_usd / self.max_usd).min(10.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
