//! Execution model configuration and construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ExecutionModel, FixedSlippage, PerfectFill, RealisticExecution};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionConfigError {
    #[error("{field} = {value} must be a probability in [0, 1]")]
    Probability { field: &'static str, value: f64 },

    #[error("{field} = {value} must be a fraction in (0, 1]")]
    Fraction { field: &'static str, value: f64 },

    #[error("{field} = {value} must be a non-negative number of basis points")]
    NegativeBps { field: &'static str, value: f64 },

    #[error("{field} = {value} bps must be below 10000")]
    BpsTooLarge { field: &'static str, value: f64 },

    #[error("{field} = {value} must not be negative")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} = {value} must be positive")]
    NonPositive { field: &'static str, value: f64 },

    #[error("latency range is empty (min {min_ms} ms > max {max_ms} ms)")]
    LatencyRange { min_ms: u64, max_ms: u64 },
}

/// Which execution model a run uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionModelConfig {
    #[default]
    PerfectFill,
    FixedSlippage {
        slippage_bps: f64,
        #[serde(default)]
        taker_fee_bps: f64,
    },
    Realistic(RealisticExecution),
}

impl ExecutionModelConfig {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        match self {
            ExecutionModelConfig::PerfectFill => Ok(()),
            ExecutionModelConfig::FixedSlippage {
                slippage_bps,
                taker_fee_bps,
            } => {
                for (field, value) in [
                    ("slippage_bps", *slippage_bps),
                    ("taker_fee_bps", *taker_fee_bps),
                ] {
                    if !(value.is_finite() && value >= 0.0) {
                        return Err(ExecutionConfigError::NegativeBps { field, value });
                    }
                }
                Ok(())
            }
            ExecutionModelConfig::Realistic(model) => model.validate(),
        }
    }

    /// Validate and build the model.
    pub fn build(&self) -> Result<Box<dyn ExecutionModel>, ExecutionConfigError> {
        self.validate()?;
        Ok(match self {
            ExecutionModelConfig::PerfectFill => Box::new(PerfectFill),
            ExecutionModelConfig::FixedSlippage {
                slippage_bps,
                taker_fee_bps,
            } => Box::new(FixedSlippage::new(*slippage_bps, *taker_fee_bps)),
            ExecutionModelConfig::Realistic(model) => Box::new(model.clone()),
        })
    }
}
