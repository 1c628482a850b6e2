//! Latency sampling.
//!
//! Latency is per venue. When a sampled latency reaches the candle interval
//! the order lands on the next candle and executes against its open, which is
//! how a fast-moving price reorders execution.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ExecutionConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LatencyModel {
    Fixed { ms: u64 },
    Uniform { min_ms: u64, max_ms: u64 },
    /// Exponential with the given mean, truncated at `cap_ms`.
    Exponential { mean_ms: f64, cap_ms: u64 },
}

impl Default for LatencyModel {
    fn default() -> Self {
        LatencyModel::Fixed { ms: 0 }
    }
}

impl LatencyModel {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        match *self {
            LatencyModel::Fixed { .. } => Ok(()),
            LatencyModel::Uniform { min_ms, max_ms } => {
                if min_ms > max_ms {
                    return Err(ExecutionConfigError::LatencyRange { min_ms, max_ms });
                }
                Ok(())
            }
            LatencyModel::Exponential { mean_ms, .. } => {
                if !(mean_ms.is_finite() && mean_ms > 0.0) {
                    return Err(ExecutionConfigError::NonPositive {
                        field: "latency.mean_ms",
                        value: mean_ms,
                    });
                }
                Ok(())
            }
        }
    }

    /// Draw one latency in milliseconds. Consumes exactly one draw.
    pub fn sample(&self, rng: &mut dyn RngCore) -> u64 {
        let u: f64 = rng.gen();
        match *self {
            LatencyModel::Fixed { ms } => ms,
            LatencyModel::Uniform { min_ms, max_ms } => {
                let span = (max_ms - min_ms) as f64;
                min_ms + (u * (span + 1.0)).floor().min(span) as u64
            }
            LatencyModel::Exponential { mean_ms, cap_ms } => {
                let draw = -mean_ms * (1.0 - u).ln();
                (draw.round() as u64).min(cap_ms)
            }
        }
    }
}

/// Latency model per venue, with a fallback for unlisted venues.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub default: LatencyModel,
    /// BTreeMap keeps serialization (and therefore fingerprints) ordered.
    pub venues: BTreeMap<String, LatencyModel>,
}

impl LatencyConfig {
    pub fn for_venue(&self, venue: &str) -> &LatencyModel {
        self.venues.get(venue).unwrap_or(&self.default)
    }

    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        self.default.validate()?;
        for model in self.venues.values() {
            model.validate()?;
        }
        Ok(())
    }
}
