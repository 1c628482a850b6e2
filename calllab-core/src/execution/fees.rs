//! Fee schedule: taker fee in bps of executed notional plus a fixed
//! per-transaction cost (gas / priority fee) in USD.

use serde::{Deserialize, Serialize};

use super::ExecutionConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub taker_fee_bps: f64,
    pub fixed_fee_usd: f64,
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        if !(self.taker_fee_bps.is_finite() && self.taker_fee_bps >= 0.0) {
            return Err(ExecutionConfigError::NegativeBps {
                field: "fees.taker_fee_bps",
                value: self.taker_fee_bps,
            });
        }
        if !(self.fixed_fee_usd.is_finite() && self.fixed_fee_usd >= 0.0) {
            return Err(ExecutionConfigError::Negative {
                field: "fees.fixed_fee_usd",
                value: self.fixed_fee_usd,
            });
        }
        Ok(())
    }

    /// Fee for a filled transaction.
    pub fn fee(&self, executed_notional: f64) -> f64 {
        executed_notional * self.taker_fee_bps / 10_000.0 + self.fixed_fee_usd
    }

    /// Fee for a transaction that landed but did not fill (gas is still paid).
    pub fn failed_fee(&self) -> f64 {
        self.fixed_fee_usd
    }
}
