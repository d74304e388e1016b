//! Model pricing tables and cost estimation.
//!
//! Pricing is a configuration table of per-model USD rates per 1K tokens
//! with a default rate for unknown models. The table is an average-cost
//! heuristic for prospective budget checks — actual reported usage always
//! wins when the backend supplies it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-model average-cost estimator.
pub trait CostEstimator: Send + Sync {
    /// Estimated USD cost of `tokens` on `model`.
    fn estimate_usd(&self, model: &str, tokens: u64) -> f64;
}

/// Configuration table of per-1K-token rates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTable {
    /// USD per 1K tokens, keyed by model identifier.
    pub rates_per_1k: BTreeMap<String, f64>,
    /// Rate applied to models missing from the table.
    pub default_rate_per_1k: f64,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        let _ = rates.insert("gpt-5".to_string(), 0.045);
        let _ = rates.insert("gpt-5-mini".to_string(), 0.018);
        let _ = rates.insert("gpt-5-nano".to_string(), 0.004);
        let _ = rates.insert("claude-opus-4-1".to_string(), 0.048);
        let _ = rates.insert("claude-sonnet-4-5".to_string(), 0.032);
        let _ = rates.insert("claude-sonnet-4".to_string(), 0.024);
        let _ = rates.insert("claude-haiku-4-5".to_string(), 0.008);
        let _ = rates.insert("ollama::llama3".to_string(), 0.0);
        let _ = rates.insert("ollama::codellama".to_string(), 0.0);
        Self {
            rates_per_1k: rates,
            default_rate_per_1k: 0.02,
        }
    }
}

impl PricingTable {
    /// Rate for a model, falling back to the default.
    #[must_use]
    pub fn rate(&self, model: &str) -> f64 {
        self.rates_per_1k
            .get(model)
            .copied()
            .unwrap_or(self.default_rate_per_1k)
    }
}

impl CostEstimator for PricingTable {
    #[allow(clippy::cast_precision_loss)] // token counts never approach 2^52
    fn estimate_usd(&self, model: &str, tokens: u64) -> f64 {
        let usd = self.rate(model) * (tokens as f64 / 1000.0);
        (usd * 10_000.0).round() / 10_000.0
    }
}

/// Rough token estimate for a piece of content.
///
/// Four characters per token plus a fixed prompt overhead. Only used for
/// prospective affordability checks; committed usage comes from the
/// translator when reported.
#[must_use]
pub fn estimate_tokens(content: &str) -> u64 {
    (content.len() as u64 / 4).max(1) + 256
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
