//! Execution reality model: converts idealised trade requests into fills.
//!
//! Key concepts:
//! - **Model contract**: `execute(request, rng) -> result`, total and deterministic given the RNG
//! - **Latency**: per-venue sampling; crossing a candle boundary reprices at the next open
//! - **Slippage**: fixed or size-aware (linear, sqrt, constant-product)
//! - **Partial fills**: probabilistic or capped by liquidity participation
//! - **Failures**: failed / reorged transactions reported as `success: false`
//! - **Fees**: taker bps plus a fixed per-transaction cost

pub mod config;
pub mod failure;
pub mod fees;
pub mod latency;
pub mod liquidity;
pub mod model;
pub mod realistic;
pub mod slippage;

pub use config::{ExecutionConfigError, ExecutionModelConfig};
pub use failure::{FailureKind, FailureModel};
pub use fees::FeeSchedule;
pub use latency::{LatencyConfig, LatencyModel};
pub use liquidity::PartialFillModel;
pub use model::{
    adverse_bps, apply_adverse_bps, ExecutionModel, ExecutionResult, FixedSlippage,
    MarketSnapshot, PerfectFill, TradeRequest,
};
pub use realistic::RealisticExecution;
pub use slippage::SlippageModel;

/// Default venue name for requests that don't name one.
pub const DEFAULT_VENUE: &str = "default";

/// Build a request against a bare price snapshot.
#[cfg(test)]
pub fn test_request(side: crate::domain::Side, quantity: f64, price: f64) -> TradeRequest {
    TradeRequest {
        side,
        quantity,
        price,
        venue: DEFAULT_VENUE.into(),
        snapshot: MarketSnapshot::at(price),
    }
}
