//! Backtest driver: exit walks routed through an execution model, with re-entries.
//!
//! One call, one synchronous path: validate → precompute signal → walk →
//! execute fills → offer stop-outs to the re-entry machine → repeat. All
//! randomness comes from one `StdRng` seeded from `seed`, so equal inputs
//! and seeds yield an identical event trace and trace hash.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{validate_candles, CallContext, Candle, CandleError, Side, Trade};
use crate::execution::{
    ExecutionConfigError, ExecutionModel, ExecutionModelConfig, MarketSnapshot, TradeRequest,
};
use crate::fingerprint::{RunFingerprint, TraceHash};
use crate::indicators::IndicatorCache;
use crate::plan::{PlanError, ValidatedPlan};

use super::events::SimEvent;
use super::exit_stack::{
    entry_index, precompute_signal, walk_exit_plan, ExitSimulation, FeeConfig, NoTradeReason,
    WalkStart, QTY_EPSILON,
};
use super::reentry::{validate_reentry_sequence, ReEntryConfig, ReEntryMachine};
use super::trade_extraction::{trade_from_execution, WalkCosts};

/// Raised before simulation starts; input absence is never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid candles: {0}")]
    InvalidCandles(#[from] CandleError),

    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("invalid execution model: {0}")]
    Execution(#[from] ExecutionConfigError),

    #[error("position size {0} must be positive and finite")]
    PositionSize(f64),
}

#[derive(Debug, Clone)]
pub struct BacktestInputs<'a> {
    pub call: &'a CallContext,
    pub candles: &'a [Candle],
    pub entry_ts_ms: i64,
    /// Defaults to the entry candle's open.
    pub entry_px: Option<f64>,
    pub plan: &'a ValidatedPlan,
    pub reentry: ReEntryConfig,
    pub execution: &'a ExecutionModelConfig,
    pub position_size_usd: f64,
    /// Quote liquidity handed to size-aware slippage and participation caps.
    pub liquidity_usd: Option<f64>,
    pub venue: &'a str,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub trades: Vec<Trade>,
    pub events: Vec<SimEvent>,
    pub trace_hash: TraceHash,
    pub no_trade: Option<NoTradeReason>,
    pub fingerprint: RunFingerprint,
}

struct PendingEntry {
    walk: u32,
    candle_index: usize,
    eval_from: usize,
    price: f64,
    size_fraction: f64,
}

pub fn backtest_exit_stack(inputs: &BacktestInputs<'_>) -> Result<BacktestOutcome, SimError> {
    validate_candles(inputs.candles)?;
    inputs.reentry.validate()?;
    let model = inputs.execution.build()?;
    if !(inputs.position_size_usd.is_finite() && inputs.position_size_usd > 0.0) {
        return Err(SimError::PositionSize(inputs.position_size_usd));
    }

    let mut run = Run {
        inputs,
        model: model.as_ref(),
        rng: StdRng::seed_from_u64(inputs.seed),
        events: Vec::new(),
        trades: Vec::new(),
    };
    let no_trade = run.simulate();

    let trace_hash = TraceHash::of(&run.events);
    let fingerprint = RunFingerprint {
        call_id: inputs.call.call_id.clone(),
        seed: inputs.seed,
        plan: inputs.plan.fingerprint(),
        execution_model: model.name().to_string(),
        trace: trace_hash.clone(),
    };
    debug!(
        call_id = %inputs.call.call_id,
        trades = run.trades.len(),
        events = run.events.len(),
        trace_hash = %trace_hash,
        "backtest finished"
    );

    Ok(BacktestOutcome {
        trades: run.trades,
        events: run.events,
        trace_hash,
        no_trade,
        fingerprint,
    })
}

struct Run<'a, 'm> {
    inputs: &'a BacktestInputs<'a>,
    model: &'m dyn ExecutionModel,
    rng: StdRng,
    events: Vec<SimEvent>,
    trades: Vec<Trade>,
}

impl Run<'_, '_> {
    fn simulate(&mut self) -> Option<NoTradeReason> {
        let candles = self.inputs.candles;
        let plan = self.inputs.plan;

        let Some(first) = entry_index(candles, self.inputs.entry_ts_ms) else {
            return Some(self.no_trade(NoTradeReason::NoEntryCandle));
        };
        let entry_px = self.inputs.entry_px.unwrap_or(candles[first].open);
        if !(entry_px.is_finite() && entry_px > 0.0) {
            return Some(self.no_trade(NoTradeReason::InvalidEntryPrice));
        }

        let mut cache = IndicatorCache::default();
        let signal = precompute_signal(candles, plan, &mut cache);
        let horizon_ms = plan
            .max_hold_ms()
            .map(|hold| candles[first].timestamp_ms().saturating_add(hold));
        let original_qty = self.inputs.position_size_usd / entry_px;
        let mut machine = ReEntryMachine::new(self.inputs.reentry);

        let mut next = Some(PendingEntry {
            walk: 0,
            candle_index: first,
            eval_from: first,
            price: entry_px,
            size_fraction: 1.0,
        });

        while let Some(pending) = next.take() {
            let requested_qty = original_qty * pending.size_fraction;
            let request = self.request(Side::Buy, requested_qty, pending.price, pending.candle_index);
            let result = self.model.execute(&request, &mut self.rng);
            let filled = result.success && result.executed_quantity > 0.0;
            self.events.push(SimEvent::EntryExecuted {
                walk: pending.walk,
                candle_index: pending.candle_index,
                requested_price: pending.price,
                requested_quantity: requested_qty,
                result: result.clone(),
            });
            if !filled {
                debug!(
                    call_id = %self.inputs.call.call_id,
                    walk = pending.walk,
                    error = result.error.as_deref().unwrap_or(""),
                    "entry not filled"
                );
                if pending.walk == 0 {
                    return Some(self.no_trade(NoTradeReason::EntryNotFilled));
                }
                break;
            }

            let start = WalkStart {
                entry_ts_ms: candles[pending.candle_index].timestamp_ms(),
                entry_px: pending.price,
                eval_from: pending.eval_from,
                deadline_ms: horizon_ms,
            };
            let outcome = walk_exit_plan(candles, &start, plan, &signal, &FeeConfig::zero());
            let Some(sim) = outcome.into_closed() else {
                break;
            };

            let mut costs = WalkCosts {
                quantity: result.executed_quantity,
                entry_notional: result.executed_notional(),
                entry_fee: result.fee,
                slippage_usd: (result.executed_price - pending.price) * result.executed_quantity,
                ..Default::default()
            };
            self.execute_exits(pending.walk, &sim, &mut costs);
            self.trades.push(trade_from_execution(
                self.inputs.call,
                pending.walk,
                pending.size_fraction,
                &sim,
                &costs,
            ));

            next = self.seek_reentry(&mut machine, &sim, pending.walk, pending.price, horizon_ms);
        }

        None
    }

    /// Route each exit fill through the execution model. Unfilled quantity
    /// carries into the next fill; whatever is left is marked to the last close.
    fn execute_exits(&mut self, walk: u32, sim: &ExitSimulation, costs: &mut WalkCosts) {
        let held = costs.quantity;
        let mut remaining = held;
        let mut carried = 0.0;

        for fill in &sim.fills {
            self.events.push(SimEvent::ExitTriggered { walk, fill: *fill });
            let wanted = (held * fill.fraction + carried).min(remaining);
            if wanted <= held * QTY_EPSILON {
                continue;
            }
            let request = self.request(Side::Sell, wanted, fill.price, fill.candle_index);
            let result = self.model.execute(&request, &mut self.rng);
            costs.exit_fees += result.fee;
            let executed = if result.success {
                result.executed_quantity.min(wanted)
            } else {
                0.0
            };
            costs.exit_proceeds += result.executed_price * executed;
            costs.slippage_usd += (fill.price - result.executed_price) * executed;
            remaining -= executed;
            carried = wanted - executed;

            self.events.push(SimEvent::ExitExecuted {
                walk,
                candle_index: fill.candle_index,
                reason: fill.reason,
                requested_price: fill.price,
                requested_quantity: wanted,
                result,
            });
        }

        if remaining > held * QTY_EPSILON {
            let candles = self.inputs.candles;
            let last_index = candles.len() - 1;
            let price = candles[last_index].close;
            costs.exit_proceeds += price * remaining;
            self.events.push(SimEvent::ResidualMarked {
                walk,
                candle_index: last_index,
                price,
                quantity: remaining,
            });
        }
    }

    /// Offer a stop-out to the re-entry machine and scan forward for a trigger.
    fn seek_reentry(
        &mut self,
        machine: &mut ReEntryMachine,
        sim: &ExitSimulation,
        walk: u32,
        walk_entry_px: f64,
        horizon_ms: Option<i64>,
    ) -> Option<PendingEntry> {
        let exit = sim.final_fill()?;
        if !exit.reason.is_stop() || !machine.on_exit(exit.price, exit.candle_index) {
            return None;
        }
        self.events.push(SimEvent::ReEntryWaiting {
            walk,
            exit_index: exit.candle_index,
            reference_price: machine.state().reference_price,
            trigger_price: machine.state().trigger_price,
        });

        let candles = self.inputs.candles;
        for (i, candle) in candles.iter().enumerate().skip(exit.candle_index + 1) {
            if horizon_ms.is_some_and(|h| candle.timestamp_ms() >= h) {
                machine.cancel();
                self.events.push(SimEvent::ReEntryCancelled { candle_index: i });
                return None;
            }
            let Some(request) = machine.on_candle(i, candle) else {
                continue;
            };

            if let Some(stop) = self.inputs.plan.hard_stop_price(walk_entry_px) {
                if !validate_reentry_sequence(candles, request.exit_index, i, stop) {
                    warn!(
                        call_id = %self.inputs.call.call_id,
                        exit_index = request.exit_index,
                        candle_index = i,
                        stop_loss_price = stop,
                        "re-entry rejected: stop-loss breached while waiting"
                    );
                    machine.cancel();
                    self.events.push(SimEvent::ReEntryRejected {
                        candle_index: i,
                        exit_index: request.exit_index,
                        stop_loss_price: stop,
                    });
                    return None;
                }
            }

            self.events.push(SimEvent::ReEntryTriggered {
                walk: walk + 1,
                candle_index: i,
                price: request.price,
                size_fraction: request.size_fraction,
            });
            return Some(PendingEntry {
                walk: walk + 1,
                candle_index: i,
                eval_from: i + 1,
                price: request.price,
                size_fraction: request.size_fraction,
            });
        }

        machine.cancel();
        self.events.push(SimEvent::ReEntryCancelled {
            candle_index: candles.len() - 1,
        });
        None
    }

    fn request(&self, side: Side, quantity: f64, price: f64, index: usize) -> TradeRequest {
        let candles = self.inputs.candles;
        let interval_ms = match (candles.get(index), candles.get(index + 1)) {
            (Some(cur), Some(next)) => next.timestamp_ms() - cur.timestamp_ms(),
            (Some(cur), None) if index > 0 => cur.timestamp_ms() - candles[index - 1].timestamp_ms(),
            _ => 0,
        };
        TradeRequest {
            side,
            quantity,
            price,
            venue: self.inputs.venue.to_string(),
            snapshot: MarketSnapshot {
                price,
                interval_ms,
                next_open: candles.get(index + 1).map(|c| c.open),
                liquidity_usd: self.inputs.liquidity_usd,
            },
        }
    }

    fn no_trade(&mut self, reason: NoTradeReason) -> NoTradeReason {
        debug!(call_id = %self.inputs.call.call_id, %reason, "no trade");
        self.events.push(SimEvent::NoTrade { reason });
        reason
    }
}
