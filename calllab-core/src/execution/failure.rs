//! Transaction failure and reorg sampling.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ExecutionConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rejected or reverted before inclusion.
    Failed,
    /// Included, then dropped by a chain reorganisation.
    Reorged,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Failed => f.write_str("transaction failed"),
            FailureKind::Reorged => f.write_str("transaction reorged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureModel {
    pub failure_probability: f64,
    pub reorg_probability: f64,
}

impl FailureModel {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        for (field, value) in [
            ("failure.failure_probability", self.failure_probability),
            ("failure.reorg_probability", self.reorg_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ExecutionConfigError::Probability { field, value });
            }
        }
        Ok(())
    }

    /// Consumes exactly two draws so the RNG stream does not depend on the outcome.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Option<FailureKind> {
        let fail: f64 = rng.gen();
        let reorg: f64 = rng.gen();
        if fail < self.failure_probability {
            Some(FailureKind::Failed)
        } else if reorg < self.reorg_probability {
            Some(FailureKind::Reorged)
        } else {
            None
        }
    }
}
