//! Model routing and the fallback chain.
//!
//! The router owns which model the session dispatches to next. When the
//! guardrail reports the active model unaffordable and auto-switch is
//! enabled, the router steps down the configured fallback chain one model
//! at a time; when the chain is exhausted it signals the session to pause.

use tracing::info;

/// Routes chunks to the active model, stepping down a fallback chain on
/// budget pressure.
///
/// The chain is `[primary, fallback…]`; `active_index` is persisted in the
/// session's cost state so resume lands on the same model.
#[derive(Clone, Debug)]
pub struct ModelRouter {
    chain: Vec<String>,
    auto_switch: bool,
    active_index: usize,
}

impl ModelRouter {
    /// Build a router from the primary model and the configured chain.
    #[must_use]
    pub fn new(primary: impl Into<String>, fallback_chain: &[String], auto_switch: bool) -> Self {
        let mut chain = vec![primary.into()];
        chain.extend(fallback_chain.iter().cloned());
        Self {
            chain,
            auto_switch,
            active_index: 0,
        }
    }

    /// Restore the router to a persisted fallback position.
    #[must_use]
    pub fn resume_at(mut self, index: usize) -> Self {
        self.active_index = index.min(self.chain.len() - 1);
        self
    }

    /// The model the next dispatch will use.
    #[must_use]
    pub fn active_model(&self) -> &str {
        &self.chain[self.active_index]
    }

    /// How far down the chain the router has switched (0 = primary).
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Whether a cheaper model remains to switch to.
    #[must_use]
    pub fn has_fallback_remaining(&self) -> bool {
        self.auto_switch && self.active_index + 1 < self.chain.len()
    }

    /// Switch to the next model in the chain.
    ///
    /// Returns the new active model, or `None` when auto-switch is off or
    /// the chain is exhausted — the caller then pauses the session with
    /// reason `budget_exhausted`. A switch retries the *same* chunk and
    /// does not count against its attempt count.
    pub fn switch_to_fallback(&mut self) -> Option<&str> {
        if !self.has_fallback_remaining() {
            return None;
        }
        let from = self.chain[self.active_index].clone();
        self.active_index += 1;
        let to = self.active_model();
        info!(%from, %to, "switched to fallback model");
        Some(to)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
