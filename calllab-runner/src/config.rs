//! Serializable simulation configuration, loaded from TOML.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use calllab_core::engine::ReEntryConfig;
use calllab_core::execution::{ExecutionConfigError, ExecutionModelConfig, DEFAULT_VENUE};
use calllab_core::plan::{ExitPlan, PlanError, ValidatedPlan};
use calllab_core::quality::QualityGateConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid exit plan: {0}")]
    Plan(#[from] PlanError),

    #[error("invalid execution model: {0}")]
    Execution(#[from] ExecutionConfigError),

    #[error("invalid batch settings: {0}")]
    Batch(String),
}

/// Everything a batch needs besides the calls themselves.
///
/// This struct captures all parameters needed to reproduce a batch:
/// - Exit plan and re-entry policy
/// - Execution model
/// - Quality gate thresholds
/// - Batch settings (seed, sizing, concurrency)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub plan: ExitPlan,
    pub reentry: ReEntryConfig,
    pub execution: ExecutionModelConfig,
    pub quality: QualityGateConfig,
    pub batch: BatchSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Worker threads; 0 uses rayon's default.
    pub max_threads: usize,
    /// Abort the whole batch on an enforced gate failure instead of skipping the call.
    pub abort_on_gate_failure: bool,
    pub master_seed: u64,
    pub position_size_usd: f64,
    pub venue: String,
    /// Candle interval used when a call carries no explicit quality window.
    pub interval_secs: i64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_threads: 0,
            abort_on_gate_failure: false,
            master_seed: 42,
            position_size_usd: 1_000.0,
            venue: DEFAULT_VENUE.to_string(),
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// Validate every section; returns the frozen exit plan.
    pub fn validate(&self) -> Result<ValidatedPlan, ConfigError> {
        let plan = self.plan.clone().validate()?;
        self.reentry.validate()?;
        self.execution.validate()?;

        let batch = &self.batch;
        if !(batch.position_size_usd.is_finite() && batch.position_size_usd > 0.0) {
            return Err(ConfigError::Batch(format!(
                "position_size_usd must be positive, got {}",
                batch.position_size_usd
            )));
        }
        if batch.interval_secs <= 0 {
            return Err(ConfigError::Batch(format!(
                "interval_secs must be positive, got {}",
                batch.interval_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.quality.min_coverage) {
            return Err(ConfigError::Batch(format!(
                "quality.min_coverage must be in [0, 1], got {}",
                self.quality.min_coverage
            )));
        }
        Ok(plan)
    }
}
