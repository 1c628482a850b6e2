//! Execution model contract and the two simple models.
//!
//! `execute` is total: every input, malformed ones included, yields an
//! [`ExecutionResult`]. Simulated failures are `success: false` with an error
//! string, never a panic or an `Err`, so a failed leg is treated as "no fill"
//! by the caller instead of aborting the call.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Market state visible to the execution model at request time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Reference price at request time.
    pub price: f64,
    /// Candle interval; latency at or beyond it lands on the next candle.
    pub interval_ms: i64,
    /// Open of the next candle, if one exists.
    pub next_open: Option<f64>,
    /// Quote-side liquidity in USD, if known.
    pub liquidity_usd: Option<f64>,
}

impl MarketSnapshot {
    pub fn at(price: f64) -> Self {
        Self {
            price,
            interval_ms: 0,
            next_open: None,
            liquidity_usd: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub side: Side,
    /// Token quantity.
    pub quantity: f64,
    /// Requested (idealised) price.
    pub price: f64,
    pub venue: String,
    pub snapshot: MarketSnapshot,
}

impl TradeRequest {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Whether the request is executable at all.
    pub fn check(&self) -> Result<(), String> {
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(format!("invalid price {}", self.price));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(format!("invalid quantity {}", self.quantity));
        }
        Ok(())
    }
}

/// Outcome of one execution. A value object; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub executed_price: f64,
    pub executed_quantity: f64,
    /// Adverse price move vs. the requested price (negative = price improvement).
    pub slippage_bps: f64,
    /// Fees in USD.
    pub fee: f64,
    pub latency_ms: u64,
    pub partial_fill: bool,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failed(latency_ms: u64, fee: f64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            executed_price: 0.0,
            executed_quantity: 0.0,
            slippage_bps: 0.0,
            fee,
            latency_ms,
            partial_fill: false,
            error: Some(error.into()),
        }
    }

    pub fn executed_notional(&self) -> f64 {
        self.executed_price * self.executed_quantity
    }
}

/// Adverse slippage of `executed` vs. `requested` for `side`, in bps.
pub fn adverse_bps(side: Side, requested: f64, executed: f64) -> f64 {
    match side {
        Side::Buy => (executed / requested - 1.0) * 10_000.0,
        Side::Sell => (1.0 - executed / requested) * 10_000.0,
    }
}

/// Move `price` against the trader by `bps`.
pub fn apply_adverse_bps(side: Side, price: f64, bps: f64) -> f64 {
    match side {
        Side::Buy => price * (1.0 + bps / 10_000.0),
        Side::Sell => price * (1.0 - bps / 10_000.0),
    }
}

/// Converts an idealised trade request into a realistic fill.
///
/// Deterministic given the RNG state: the same request and the same RNG
/// stream always produce the same result.
pub trait ExecutionModel: Send + Sync {
    fn execute(&self, request: &TradeRequest, rng: &mut dyn RngCore) -> ExecutionResult;

    fn name(&self) -> &str;
}

/// Identity model: executed = requested, zero latency, slippage and fees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfectFill;

impl ExecutionModel for PerfectFill {
    fn execute(&self, request: &TradeRequest, _rng: &mut dyn RngCore) -> ExecutionResult {
        if let Err(e) = request.check() {
            return ExecutionResult::failed(0, 0.0, e);
        }
        ExecutionResult {
            success: true,
            executed_price: request.price,
            executed_quantity: request.quantity,
            slippage_bps: 0.0,
            fee: 0.0,
            latency_ms: 0,
            partial_fill: false,
            error: None,
        }
    }

    fn name(&self) -> &str {
        "perfect_fill"
    }
}

/// Constant directional slippage plus a taker fee on executed notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSlippage {
    pub slippage_bps: f64,
    pub taker_fee_bps: f64,
}

impl FixedSlippage {
    pub fn new(slippage_bps: f64, taker_fee_bps: f64) -> Self {
        Self {
            slippage_bps,
            taker_fee_bps,
        }
    }
}

impl ExecutionModel for FixedSlippage {
    fn execute(&self, request: &TradeRequest, _rng: &mut dyn RngCore) -> ExecutionResult {
        if let Err(e) = request.check() {
            return ExecutionResult::failed(0, 0.0, e);
        }
        let executed_price = apply_adverse_bps(request.side, request.price, self.slippage_bps);
        let fee = executed_price * request.quantity * self.taker_fee_bps / 10_000.0;
        ExecutionResult {
            success: true,
            executed_price,
            executed_quantity: request.quantity,
            slippage_bps: self.slippage_bps,
            fee,
            latency_ms: 0,
            partial_fill: false,
            error: None,
        }
    }

    fn name(&self) -> &str {
        "fixed_slippage"
    }
}
