//! Partial fill models: how much of a request actually fills.
//!
//! `LiquidityCapped` limits the filled notional to a share of the snapshot
//! liquidity (participation cap); `Probabilistic` samples a partial fill with
//! a configured probability. The unfilled remainder is the caller's to carry.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::ExecutionConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartialFillModel {
    #[default]
    None,
    /// With `probability`, fill a uniform share in `[min_fill_fraction, 1)`.
    Probabilistic {
        probability: f64,
        min_fill_fraction: f64,
    },
    /// Fill at most `max_participation` × liquidity worth of notional.
    LiquidityCapped { max_participation: f64 },
}

impl PartialFillModel {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        match *self {
            PartialFillModel::None => Ok(()),
            PartialFillModel::Probabilistic {
                probability,
                min_fill_fraction,
            } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ExecutionConfigError::Probability {
                        field: "partial_fill.probability",
                        value: probability,
                    });
                }
                if !(min_fill_fraction > 0.0 && min_fill_fraction <= 1.0) {
                    return Err(ExecutionConfigError::Fraction {
                        field: "partial_fill.min_fill_fraction",
                        value: min_fill_fraction,
                    });
                }
                Ok(())
            }
            PartialFillModel::LiquidityCapped { max_participation } => {
                if !(max_participation > 0.0 && max_participation <= 1.0) {
                    return Err(ExecutionConfigError::Fraction {
                        field: "partial_fill.max_participation",
                        value: max_participation,
                    });
                }
                Ok(())
            }
        }
    }

    /// Share of the request that fills, in `(0, 1]`.
    pub fn fill_fraction(
        &self,
        notional: f64,
        liquidity_usd: Option<f64>,
        rng: &mut dyn RngCore,
    ) -> f64 {
        match *self {
            PartialFillModel::None => 1.0,
            PartialFillModel::Probabilistic {
                probability,
                min_fill_fraction,
            } => {
                let hit: f64 = rng.gen();
                let share: f64 = rng.gen();
                if hit < probability {
                    min_fill_fraction + (1.0 - min_fill_fraction) * share
                } else {
                    1.0
                }
            }
            PartialFillModel::LiquidityCapped { max_participation } => {
                match liquidity_usd.filter(|l| l.is_finite() && *l > 0.0) {
                    Some(liquidity) if notional > 0.0 => {
                        (liquidity * max_participation / notional).min(1.0)
                    }
                    _ => 1.0,
                }
            }
        }
    }
}
