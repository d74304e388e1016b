//! # ferry-router
//!
//! The AI boundary of the conversion engine:
//!
//! - [`Translator`]: the black-box translate capability, invoked under a
//!   timeout. Implementors live outside this workspace (providers, test
//!   fakes); the engine only needs retryable-vs-terminal failure, not the
//!   reason a specific model stalled.
//! - [`PricingTable`] / [`CostEstimator`]: per-model average-cost heuristic.
//!   Pricing is a configuration table, not hardcoded policy.
//! - [`CostGuardrail`]: prospective budget enforcement. Spend is committed
//!   once per attempt and never rolled back.
//! - [`ModelRouter`]: active model plus the ordered fallback chain.

#![deny(unsafe_code)]

mod guardrail;
mod pricing;
mod router;
mod translator;

pub use guardrail::{BudgetCheck, CostGuardrail};
pub use pricing::{estimate_tokens, CostEstimator, PricingTable};
pub use router::ModelRouter;
pub use translator::{
    translate_with_timeout, TranslateError, TranslateRequest, TranslationOutcome, Translator,
};
