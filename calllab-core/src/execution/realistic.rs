//! Composed execution model: latency, failure, partial fill, slippage, fees.
//!
//! Sampling order per request is fixed (latency, failure, partial fill) so
//! an equal seed replays an identical stream of draws.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{
    adverse_bps, apply_adverse_bps, ExecutionConfigError, ExecutionModel, ExecutionResult,
    FailureModel, FeeSchedule, LatencyConfig, PartialFillModel, SlippageModel, TradeRequest,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RealisticExecution {
    pub latency: LatencyConfig,
    pub slippage: SlippageModel,
    pub partial_fill: PartialFillModel,
    pub failure: FailureModel,
    pub fees: FeeSchedule,
}

impl RealisticExecution {
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        self.latency.validate()?;
        self.slippage.validate()?;
        self.partial_fill.validate()?;
        self.failure.validate()?;
        self.fees.validate()
    }
}

impl ExecutionModel for RealisticExecution {
    fn execute(&self, request: &TradeRequest, rng: &mut dyn RngCore) -> ExecutionResult {
        if let Err(e) = request.check() {
            return ExecutionResult::failed(0, 0.0, e);
        }

        let latency_ms = self.latency.for_venue(&request.venue).sample(rng);

        if let Some(kind) = self.failure.sample(rng) {
            return ExecutionResult::failed(latency_ms, self.fees.failed_fee(), kind.to_string());
        }

        // Latency past the candle boundary executes against the next open.
        let snapshot = &request.snapshot;
        let base_price = match snapshot.next_open {
            Some(next_open)
                if snapshot.interval_ms > 0
                    && latency_ms >= snapshot.interval_ms as u64
                    && next_open.is_finite()
                    && next_open > 0.0 =>
            {
                next_open
            }
            _ => request.price,
        };

        let fraction = self
            .partial_fill
            .fill_fraction(request.notional(), snapshot.liquidity_usd, rng);
        let executed_quantity = request.quantity * fraction;

        let bps = self.slippage.slippage_bps(
            request.side,
            executed_quantity * base_price,
            snapshot.liquidity_usd,
        );
        let executed_price = apply_adverse_bps(request.side, base_price, bps);

        ExecutionResult {
            success: true,
            executed_price,
            executed_quantity,
            slippage_bps: adverse_bps(request.side, request.price, executed_price),
            fee: self.fees.fee(executed_price * executed_quantity),
            latency_ms,
            partial_fill: fraction < 1.0,
            error: None,
        }
    }

    fn name(&self) -> &str {
        "realistic"
    }
}
