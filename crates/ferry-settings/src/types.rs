//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` with `#[serde(default)]`
//! so partial JSON is accepted — missing fields get their production default
//! during deserialization.

use ferry_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the Ferry conversion engine.
///
/// Loaded from `~/.ferry/settings.json` with defaults applied for missing
/// fields; `FERRY_*` environment variables override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FerrySettings {
    /// Settings schema version.
    pub version: String,
    /// Conversion behavior settings.
    pub conversion: ConversionSettings,
    /// Resource and concurrency limits.
    pub performance: PerformanceSettings,
    /// Model selection and translator behavior.
    pub ai: AiSettings,
    /// Budget enforcement settings.
    pub cost: CostSettings,
    /// Post-completion backup settings.
    pub backup: BackupSettings,
    /// Webhook delivery settings.
    pub delivery: DeliverySettings,
    /// Chunk retry configuration.
    pub retry: RetryConfig,
}

impl Default for FerrySettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            conversion: ConversionSettings::default(),
            performance: PerformanceSettings::default(),
            ai: AiSettings::default(),
            cost: CostSettings::default(),
            backup: BackupSettings::default(),
            delivery: DeliverySettings::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl FerrySettings {
    /// Validate the snapshot once, at session creation.
    ///
    /// Rejects values the processing loop would otherwise have to guard
    /// against on every chunk.
    pub fn validate(&self) -> Result<()> {
        if self.cost.max_usd < 0.0 {
            return Err(SettingsError::invalid(
                "cost.maxUsd",
                format!("must be non-negative, got {}", self.cost.max_usd),
            ));
        }
        if !(0.05..=1.0).contains(&self.cost.warn_fraction) {
            return Err(SettingsError::invalid(
                "cost.warnFraction",
                format!("must be in [0.05, 1.0], got {}", self.cost.warn_fraction),
            ));
        }
        if self.performance.parallel_conversions == 0 {
            return Err(SettingsError::invalid(
                "performance.parallelConversions",
                "must be at least 1",
            ));
        }
        if self.conversion.learning_trigger_count == 0 {
            return Err(SettingsError::invalid(
                "conversion.learningTriggerCount",
                "must be at least 1",
            ));
        }
        if self.ai.model.trim().is_empty() {
            return Err(SettingsError::invalid("ai.model", "must not be empty"));
        }
        if self.ai.translate_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "ai.translateTimeoutMs",
                "must be positive",
            ));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(SettingsError::invalid(
                "ai.temperature",
                format!("must be in [0.0, 2.0], got {}", self.ai.temperature),
            ));
        }
        Ok(())
    }
}

/// Conversion behavior settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// Code style hint passed through to the translator.
    pub code_style: String,
    /// What to do with source comments (`keep`, `strip`, `translate`).
    pub comments: String,
    /// Identifier naming policy (`preserve`, `idiomatic`).
    pub naming: String,
    /// Error handling policy (`adapt`, `literal`).
    pub error_handling: String,
    /// Whether manual fixes feed the cross-session pattern store.
    pub enable_learning: bool,
    /// Identical fixes required before a pattern is promoted.
    pub learning_trigger_count: u32,
    /// Minimum quality score before validation issues become blocking.
    pub quality_score_threshold: f64,
    /// Glob patterns excluded from the work plan.
    pub exclusions: Vec<String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            code_style: "native".to_string(),
            comments: "keep".to_string(),
            naming: "preserve".to_string(),
            error_handling: "adapt".to_string(),
            enable_learning: true,
            learning_trigger_count: 3,
            quality_score_threshold: 0.7,
            exclusions: Vec::new(),
        }
    }
}

/// Resource and concurrency limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceSettings {
    /// Sessions allowed to run simultaneously (1 = exclusive).
    pub parallel_conversions: usize,
    /// Worker threads hint for CPU-bound conversion steps.
    pub threads: usize,
    /// Translator requests per minute cap.
    pub api_rate_limit: u32,
    /// Toolchain validation timeout in seconds.
    pub build_timeout_seconds: u64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            parallel_conversions: 1,
            threads: 4,
            api_rate_limit: 30,
            build_timeout_seconds: 600,
        }
    }
}

/// Translation strategy preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStrategy {
    /// Default quality/cost balance.
    Balanced,
    /// Prefer cheaper models.
    Cost,
    /// Prefer faster models.
    Speed,
}

/// Model selection and translator behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    /// Primary model for translation.
    pub model: String,
    /// Sampling temperature passed to the translator.
    pub temperature: f64,
    /// Strategy preference.
    pub strategy: AiStrategy,
    /// Per-chunk translator timeout in milliseconds. A timeout is treated
    /// as a retryable translation failure.
    pub translate_timeout_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            temperature: 0.2,
            strategy: AiStrategy::Balanced,
            translate_timeout_ms: 120_000,
        }
    }
}

/// Budget enforcement settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostSettings {
    /// Whether budget enforcement is active at all.
    pub enabled: bool,
    /// Hard budget for the session in USD.
    pub max_usd: f64,
    /// Fraction of the budget at which a warning note is recorded.
    pub warn_fraction: f64,
    /// Whether to auto-switch down the fallback chain when the active
    /// model becomes unaffordable.
    pub auto_switch_enabled: bool,
    /// Ordered cheaper-model fallback chain.
    pub fallback_chain: Vec<String>,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_usd: 50.0,
            warn_fraction: 0.8,
            auto_switch_enabled: true,
            fallback_chain: Vec::new(),
        }
    }
}

/// Post-completion backup settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSettings {
    /// Whether to archive the target project on completion.
    pub enabled: bool,
    /// Backup provider id (`local`, or a cloud provider handle).
    pub provider: String,
    /// Archives retained before rotation.
    pub retention_count: u32,
    /// Remote path template; `{project}` and `{direction}` are substituted.
    pub remote_path: String,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "local".to_string(),
            retention_count: 10,
            remote_path: "{project}/{direction}".to_string(),
        }
    }
}

/// Webhook delivery settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliverySettings {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Delivery attempts before giving up.
    pub max_attempts: u32,
    /// Base backoff delay between attempts in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            timeout_ms: 12_000,
            max_attempts: 3,
            base_delay_ms: 2500,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
