//! Size-aware slippage models.
//!
//! Slippage is directional: buyers pay more, sellers receive less. Size-aware
//! variants scale with participation, the order notional as a share of the
//! snapshot's quote liquidity. Without a liquidity figure they fall back to
//! their base component.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

use super::ExecutionConfigError;

/// Upper bound on modeled slippage; keeps sell prices positive.
pub const MAX_SLIPPAGE_BPS: f64 = 9_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlippageModel {
    #[default]
    None,
    FixedBps {
        bps: f64,
    },
    /// `base + impact × participation`
    Linear {
        base_bps: f64,
        impact_bps: f64,
    },
    /// `base + impact × √participation`
    Sqrt {
        base_bps: f64,
        impact_bps: f64,
    },
    /// Constant-product pool with the snapshot liquidity as the quote reserve.
    ConstantProduct,
}

impl SlippageModel {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        let check = |field: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ExecutionConfigError::NegativeBps { field, value })
            }
        };
        match *self {
            SlippageModel::None | SlippageModel::ConstantProduct => Ok(()),
            SlippageModel::FixedBps { bps } => check("slippage.bps", bps),
            SlippageModel::Linear {
                base_bps,
                impact_bps,
            }
            | SlippageModel::Sqrt {
                base_bps,
                impact_bps,
            } => {
                check("slippage.base_bps", base_bps)?;
                check("slippage.impact_bps", impact_bps)
            }
        }
    }

    /// Adverse slippage in bps for an order of `notional` USD.
    pub fn slippage_bps(&self, side: Side, notional: f64, liquidity_usd: Option<f64>) -> f64 {
        let participation = liquidity_usd
            .filter(|l| l.is_finite() && *l > 0.0)
            .map(|l| notional / l);

        let bps = match *self {
            SlippageModel::None => 0.0,
            SlippageModel::FixedBps { bps } => bps,
            SlippageModel::Linear {
                base_bps,
                impact_bps,
            } => base_bps + impact_bps * participation.unwrap_or(0.0),
            SlippageModel::Sqrt {
                base_bps,
                impact_bps,
            } => base_bps + impact_bps * participation.unwrap_or(0.0).sqrt(),
            SlippageModel::ConstantProduct => match participation {
                // buy: avg price × (1 + Δ/R); sell: avg price × 1/(1 + Δ/R)
                Some(p) => match side {
                    Side::Buy => p * 10_000.0,
                    Side::Sell => (1.0 - 1.0 / (1.0 + p)) * 10_000.0,
                },
                None => 0.0,
            },
        };
        bps.clamp(0.0, MAX_SLIPPAGE_BPS)
    }
}
