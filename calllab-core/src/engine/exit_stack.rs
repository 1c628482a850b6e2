//! Exit plan evaluator ("exit stack").
//!
//! Walks candles forward from an entry and turns a [`ValidatedPlan`] into an
//! ordered list of [`ExitFill`]s. Long-only; quantities are fractions of the
//! walked position (1.0 = everything).
//!
//! Per candle, in order:
//! 1. Time and indicator exits (after the minimum hold) close the residual.
//!    A time exit fills at the open of the first candle at or past the
//!    deadline; an indicator exit fills at the close of the candle it fired on.
//! 2. Ladder legs and the trailing/hard stop. When both are reachable in the
//!    same candle, the plan's [`IntrabarPolicy`] decides which goes first.
//! 3. Trailing activation and high-water mark update, so the stop used on a
//!    candle only ever reflects earlier candles.
//!
//! Gap rule: a stop gapped through fills at the open (worse); a target gapped
//! through fills at the open (better).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::{validate_candles, Candle, ExitFill, ExitReason};
use crate::execution::ExecutionConfigError;
use crate::indicators::IndicatorCache;
use crate::plan::{IntrabarPolicy, TrailingActivation, ValidatedPlan};

use super::backtest::SimError;
use super::ratchet::TrailingState;

/// Residual below this is treated as fully closed.
pub const QTY_EPSILON: f64 = 1e-9;

/// Flat cost haircut applied by the fast evaluator.
///
/// The execution-model driven backtest passes [`FeeConfig::zero`] and takes
/// its costs from execution results instead.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub entry_fee_bps: f64,
    pub exit_fee_bps: f64,
    pub slippage_bps: f64,
}

impl FeeConfig {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Each component in `[0, 10000)` bps; the combined exit haircut must
    /// leave a positive price.
    pub fn validate(&self) -> Result<(), ExecutionConfigError> {
        for (field, value) in [
            ("entry_fee_bps", self.entry_fee_bps),
            ("exit_fee_bps", self.exit_fee_bps),
            ("slippage_bps", self.slippage_bps),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ExecutionConfigError::NegativeBps { field, value });
            }
        }
        let exit_haircut = self.exit_fee_bps + self.slippage_bps;
        if exit_haircut >= 10_000.0 {
            return Err(ExecutionConfigError::BpsTooLarge {
                field: "exit_fee_bps + slippage_bps",
                value: exit_haircut,
            });
        }
        Ok(())
    }

    pub fn net_entry_price(&self, price: f64) -> f64 {
        price * (1.0 + (self.entry_fee_bps + self.slippage_bps) / 10_000.0)
    }

    pub fn net_exit_price(&self, price: f64) -> f64 {
        price * (1.0 - (self.exit_fee_bps + self.slippage_bps) / 10_000.0)
    }
}

/// Why a simulation produced no trade. Normal across a sweep, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoTradeReason {
    /// No candle at or after the requested entry time.
    NoEntryCandle,
    /// Entry price missing, non-finite or non-positive.
    InvalidEntryPrice,
    /// The execution model failed or rejected the entry.
    EntryNotFilled,
    /// The walk produced no fills.
    NoFills,
}

impl fmt::Display for NoTradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoTradeReason::NoEntryCandle => "no_entry_candle",
            NoTradeReason::InvalidEntryPrice => "invalid_entry_price",
            NoTradeReason::EntryNotFilled => "entry_not_filled",
            NoTradeReason::NoFills => "no_fills",
        };
        f.write_str(s)
    }
}

/// Lifecycle of the walked position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    Open,
    PartiallyClosed,
    Closed,
}

/// A completed exit walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSimulation {
    pub entry_index: usize,
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    pub net_entry_px: f64,
    pub fills: Vec<ExitFill>,
    pub exit_ts_ms: i64,
    pub exit_px_vwap: f64,
    pub net_exit_px_vwap: f64,
    pub exit_reason: ExitReason,
    pub gross_return_pct: f64,
    pub net_return_pct: f64,
}

impl ExitSimulation {
    pub fn filled_fraction(&self) -> f64 {
        self.fills.iter().map(|f| f.fraction).sum()
    }

    /// The fill that closed the position.
    pub fn final_fill(&self) -> Option<&ExitFill> {
        self.fills.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExitOutcome {
    NoTrade { reason: NoTradeReason },
    Closed(ExitSimulation),
}

impl ExitOutcome {
    pub fn closed(&self) -> Option<&ExitSimulation> {
        match self {
            ExitOutcome::Closed(sim) => Some(sim),
            ExitOutcome::NoTrade { .. } => None,
        }
    }

    pub fn into_closed(self) -> Option<ExitSimulation> {
        match self {
            ExitOutcome::Closed(sim) => Some(sim),
            ExitOutcome::NoTrade { .. } => None,
        }
    }

    pub fn no_trade_reason(&self) -> Option<NoTradeReason> {
        match self {
            ExitOutcome::NoTrade { reason } => Some(*reason),
            ExitOutcome::Closed(_) => None,
        }
    }
}

/// Index of the first candle with timestamp ≥ `entry_ts_ms`.
pub fn entry_index(candles: &[Candle], entry_ts_ms: i64) -> Option<usize> {
    let idx = candles.partition_point(|c| c.timestamp_ms() < entry_ts_ms);
    (idx < candles.len()).then_some(idx)
}

/// Combined indicator-exit firing series for `plan` (all false without one).
pub fn precompute_signal(
    candles: &[Candle],
    plan: &ValidatedPlan,
    cache: &mut IndicatorCache,
) -> Vec<bool> {
    match &plan.indicator_exit {
        Some(indicator_exit) => indicator_exit.signal_series(candles, cache),
        None => vec![false; candles.len()],
    }
}

/// Where and how a single exit walk starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkStart {
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    /// First candle evaluated for exits.
    pub eval_from: usize,
    /// Absolute time exit deadline in unix ms.
    pub deadline_ms: Option<i64>,
}

/// Simulate `plan` from the first candle at or after `entry_ts_ms`.
///
/// The entry candle itself is evaluated for exits. The indicator cache lives
/// for this call only. Malformed candles or fees are rejected before the walk.
pub fn simulate_exit_plan(
    candles: &[Candle],
    entry_ts_ms: i64,
    entry_px: f64,
    plan: &ValidatedPlan,
    fees: &FeeConfig,
) -> Result<ExitOutcome, SimError> {
    validate_candles(candles)?;
    fees.validate()?;

    let Some(index) = entry_index(candles, entry_ts_ms) else {
        return Ok(ExitOutcome::NoTrade {
            reason: NoTradeReason::NoEntryCandle,
        });
    };

    let mut cache = IndicatorCache::default();
    let signal = precompute_signal(candles, plan, &mut cache);

    let entry_candle_ts = candles[index].timestamp_ms();
    let start = WalkStart {
        entry_ts_ms: entry_candle_ts,
        entry_px,
        eval_from: index,
        deadline_ms: plan
            .max_hold_ms()
            .map(|hold| entry_candle_ts.saturating_add(hold)),
    };
    Ok(walk_exit_plan(candles, &start, plan, &signal, fees))
}

/// Run one exit walk against a precomputed indicator signal.
///
/// `signal` is indexed like `candles`. If candles run out with quantity still
/// open, the residual closes at the last close with reason `series_end`.
pub fn walk_exit_plan(
    candles: &[Candle],
    start: &WalkStart,
    plan: &ValidatedPlan,
    signal: &[bool],
    fees: &FeeConfig,
) -> ExitOutcome {
    if !(start.entry_px.is_finite() && start.entry_px > 0.0) {
        return ExitOutcome::NoTrade {
            reason: NoTradeReason::InvalidEntryPrice,
        };
    }
    let Some(last) = candles.last() else {
        return ExitOutcome::NoTrade {
            reason: NoTradeReason::NoEntryCandle,
        };
    };

    let mut walk = ExitWalk::new(start, plan, fees);
    for (i, candle) in candles.iter().enumerate().skip(start.eval_from) {
        walk.step(i, candle, signal.get(i).copied().unwrap_or(false));
        if walk.state == PositionState::Closed {
            break;
        }
    }

    if walk.state != PositionState::Closed {
        walk.close_residual(candles.len() - 1, last, last.close, ExitReason::SeriesEnd);
    }

    walk.finish(start.eval_from)
}

struct ExitWalk<'a> {
    plan: &'a ValidatedPlan,
    fees: &'a FeeConfig,
    entry_ts_ms: i64,
    entry_px: f64,
    min_hold_ms: i64,
    deadline_ms: Option<i64>,
    hard_stop: Option<f64>,
    residual: f64,
    legs_filled: Vec<bool>,
    trailing: TrailingState,
    state: PositionState,
    fills: Vec<ExitFill>,
}

impl<'a> ExitWalk<'a> {
    fn new(start: &WalkStart, plan: &'a ValidatedPlan, fees: &'a FeeConfig) -> Self {
        let mut trailing = TrailingState::new();
        if let Some(cfg) = plan.trailing {
            if cfg.enabled && cfg.activation == TrailingActivation::Immediate {
                trailing.activate(start.entry_px);
            }
        }
        Self {
            plan,
            fees,
            entry_ts_ms: start.entry_ts_ms,
            entry_px: start.entry_px,
            min_hold_ms: plan.min_hold_ms(),
            deadline_ms: start.deadline_ms,
            hard_stop: plan.hard_stop_price(start.entry_px),
            residual: 1.0,
            legs_filled: vec![false; plan.ladder.len()],
            trailing,
            state: PositionState::Open,
            fills: Vec::new(),
        }
    }

    fn step(&mut self, i: usize, candle: &Candle, signal_fired: bool) {
        let ts_ms = candle.timestamp_ms();

        if ts_ms.saturating_sub(self.entry_ts_ms) >= self.min_hold_ms {
            if let Some(deadline) = self.deadline_ms {
                if ts_ms >= deadline {
                    self.close_residual(i, candle, candle.open, ExitReason::Time);
                    return;
                }
            }
            if signal_fired {
                self.close_residual(i, candle, candle.close, ExitReason::Signal);
                return;
            }
        }

        let stop_hit = self
            .stop_level()
            .filter(|(level, _)| candle.low <= *level);

        match (stop_hit, self.plan.intrabar_policy()) {
            (Some((level, reason)), IntrabarPolicy::StopFirst) => {
                self.close_residual(i, candle, candle.open.min(level), reason);
                return;
            }
            (Some((level, reason)), IntrabarPolicy::TargetsFirst) => {
                self.fill_targets(i, candle);
                if self.state != PositionState::Closed {
                    self.close_residual(i, candle, candle.open.min(level), reason);
                }
                return;
            }
            (None, _) => self.fill_targets(i, candle),
        }

        if self.state != PositionState::Closed {
            self.update_trailing(candle);
        }
    }

    /// Current stop and the reason it would report. The trailing level wins
    /// only when strictly above the hard floor.
    fn stop_level(&mut self) -> Option<(f64, ExitReason)> {
        let trailing_px = match self.plan.trailing {
            Some(cfg) if cfg.enabled => self
                .trailing
                .high_water_mark()
                .map(|mark| cfg.trailing_price(mark)),
            _ => None,
        };

        let (candidate, reason) = match (trailing_px, self.hard_stop) {
            (Some(t), Some(h)) if t > h => (t, ExitReason::TrailingStop),
            (_, Some(h)) => (h, ExitReason::HardStop),
            (Some(t), None) => (t, ExitReason::TrailingStop),
            (None, None) => return None,
        };

        let level = self.trailing.ratchet_stop(candidate);
        let reason = if level > candidate {
            ExitReason::TrailingStop
        } else {
            reason
        };
        Some((level, reason))
    }

    fn fill_targets(&mut self, i: usize, candle: &Candle) {
        let plan = self.plan;
        for (k, leg) in plan.ladder.iter().enumerate() {
            if self.state == PositionState::Closed {
                break;
            }
            if self.legs_filled[k] {
                continue;
            }
            let target_px = self.entry_px * leg.target;
            if candle.high >= target_px {
                self.legs_filled[k] = true;
                let qty = if leg.fraction >= self.residual - QTY_EPSILON {
                    self.residual
                } else {
                    leg.fraction
                };
                self.push_fill(i, candle, candle.open.max(target_px), qty, ExitReason::Target);
            }
        }
    }

    fn update_trailing(&mut self, candle: &Candle) {
        let Some(cfg) = self.plan.trailing else {
            return;
        };
        if !cfg.enabled {
            return;
        }
        if !self.trailing.is_active() {
            let reached = match cfg.activation {
                TrailingActivation::Immediate => true,
                TrailingActivation::AtMultiple { multiple } => {
                    candle.high >= self.entry_px * multiple
                }
                TrailingActivation::AfterFirstTarget => self.legs_filled.iter().any(|&f| f),
            };
            if reached {
                self.trailing.activate(candle.high);
            }
        }
        self.trailing.observe_high(candle.high);
    }

    fn close_residual(&mut self, i: usize, candle: &Candle, price: f64, reason: ExitReason) {
        if self.residual > 0.0 {
            self.push_fill(i, candle, price, self.residual, reason);
        }
    }

    fn push_fill(&mut self, i: usize, candle: &Candle, price: f64, qty: f64, reason: ExitReason) {
        let fill = ExitFill {
            ts_ms: candle.timestamp_ms(),
            candle_index: i,
            price,
            net_price: self.fees.net_exit_price(price),
            fraction: qty,
            reason,
        };
        debug!(
            candle_index = i,
            reason = %reason,
            price,
            fraction = qty,
            "exit fill"
        );
        self.fills.push(fill);
        self.residual -= qty;
        if self.residual <= QTY_EPSILON {
            self.residual = 0.0;
            self.state = PositionState::Closed;
        } else {
            self.state = PositionState::PartiallyClosed;
        }
    }

    fn finish(self, entry_index: usize) -> ExitOutcome {
        let Some(final_fill) = self.fills.last().copied() else {
            return ExitOutcome::NoTrade {
                reason: NoTradeReason::NoFills,
            };
        };

        let total: f64 = self.fills.iter().map(|f| f.fraction).sum();
        let exit_px_vwap = self.fills.iter().map(|f| f.price * f.fraction).sum::<f64>() / total;
        let net_exit_px_vwap =
            self.fills.iter().map(|f| f.net_price * f.fraction).sum::<f64>() / total;
        let net_entry_px = self.fees.net_entry_price(self.entry_px);

        ExitOutcome::Closed(ExitSimulation {
            entry_index,
            entry_ts_ms: self.entry_ts_ms,
            entry_px: self.entry_px,
            net_entry_px,
            fills: self.fills,
            exit_ts_ms: final_fill.ts_ms,
            exit_px_vwap,
            net_exit_px_vwap,
            exit_reason: final_fill.reason,
            gross_return_pct: (exit_px_vwap / self.entry_px - 1.0) * 100.0,
            net_return_pct: (net_exit_px_vwap / net_entry_px - 1.0) * 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandleError;
    use crate::plan::{ExitPlan, LadderLeg, TimeExitConfig, TrailingStopConfig};

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i * 60, open, high, low, close, 1000.0)
    }

    /// Rises from 1.0 through 2.2, then falls to 1.5.
    fn pump_and_fade() -> Vec<Candle> {
        vec![
            candle(0, 1.0, 1.05, 0.95, 1.0),
            candle(1, 1.0, 1.5, 0.98, 1.4),
            candle(2, 1.4, 2.05, 1.38, 2.0),
            candle(3, 2.0, 2.2, 1.95, 2.15),
            candle(4, 2.15, 2.16, 1.9, 1.95),
            candle(5, 1.95, 1.96, 1.6, 1.65),
            candle(6, 1.65, 1.7, 1.5, 1.5),
        ]
    }

    fn trailing(activation: TrailingActivation, policy: IntrabarPolicy) -> TrailingStopConfig {
        TrailingStopConfig {
            enabled: true,
            trail_bps: 1500.0,
            activation,
            hard_stop_bps: Some(2500.0),
            intrabar_policy: policy,
        }
    }

    fn ladder_plan(policy: IntrabarPolicy) -> ValidatedPlan {
        ExitPlan {
            ladder: vec![LadderLeg {
                target: 2.0,
                fraction: 0.5,
            }],
            trailing: Some(trailing(
                TrailingActivation::AtMultiple { multiple: 2.0 },
                policy,
            )),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn ladder_then_trailing_stop() {
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();

        assert_eq!(sim.fills.len(), 2);
        assert_eq!(sim.fills[0].reason, ExitReason::Target);
        assert_eq!(sim.fills[0].candle_index, 2);
        assert!((sim.fills[0].price - 2.0).abs() < 1e-12);
        assert!((sim.fills[0].fraction - 0.5).abs() < 1e-12);

        assert_eq!(sim.fills[1].reason, ExitReason::TrailingStop);
        assert_eq!(sim.fills[1].candle_index, 5);
        assert!((sim.fills[1].price - 1.87).abs() < 1e-9);

        assert_eq!(sim.filled_fraction(), 1.0);
        assert_eq!(sim.exit_reason, ExitReason::TrailingStop);
        assert!((sim.exit_px_vwap - 1.935).abs() < 1e-9);
        assert!((sim.gross_return_pct - 93.5).abs() < 1e-6);
    }

    #[test]
    fn no_entry_candle_is_no_trade() {
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let outcome = simulate_exit_plan(&pump_and_fade(), 10_000_000, 1.0, &plan, &FeeConfig::zero()).unwrap();
        assert_eq!(outcome.no_trade_reason(), Some(NoTradeReason::NoEntryCandle));
        let empty: Vec<Candle> = Vec::new();
        let outcome = simulate_exit_plan(&empty, 0, 1.0, &plan, &FeeConfig::zero()).unwrap();
        assert_eq!(outcome.no_trade_reason(), Some(NoTradeReason::NoEntryCandle));
    }

    #[test]
    fn invalid_entry_price_is_no_trade() {
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let outcome = simulate_exit_plan(&pump_and_fade(), 0, 0.0, &plan, &FeeConfig::zero()).unwrap();
        assert_eq!(outcome.no_trade_reason(), Some(NoTradeReason::InvalidEntryPrice));
    }

    #[test]
    fn entry_starts_at_first_candle_at_or_after_request() {
        let plan = ExitPlan::default().validate().unwrap();
        let sim = simulate_exit_plan(&pump_and_fade(), 61_000, 1.4, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.entry_index, 2);
        assert_eq!(sim.entry_ts_ms, 120_000);
    }

    fn whipsaw() -> Vec<Candle> {
        vec![
            candle(0, 1.0, 1.0, 1.0, 1.0),
            // reaches 2.0 and 0.7 in the same candle
            candle(1, 1.0, 2.1, 0.7, 1.0),
            candle(2, 1.0, 1.1, 0.9, 1.0),
        ]
    }

    #[test]
    fn stop_first_takes_whole_residual() {
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let sim = simulate_exit_plan(&whipsaw(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills.len(), 1);
        assert_eq!(sim.fills[0].reason, ExitReason::HardStop);
        assert!((sim.fills[0].price - 0.75).abs() < 1e-12);
        assert_eq!(sim.fills[0].fraction, 1.0);
    }

    #[test]
    fn targets_first_fills_ladder_then_stop() {
        let plan = ladder_plan(IntrabarPolicy::TargetsFirst);
        let sim = simulate_exit_plan(&whipsaw(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        let reasons: Vec<_> = sim.fills.iter().map(|f| f.reason).collect();
        assert_eq!(reasons, vec![ExitReason::Target, ExitReason::HardStop]);
        assert_eq!(sim.filled_fraction(), 1.0);
    }

    #[test]
    fn gapped_stop_fills_at_open() {
        let candles = vec![
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 0.6, 0.65, 0.5, 0.55),
        ];
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let sim = simulate_exit_plan(&candles, 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills[0].reason, ExitReason::HardStop);
        assert_eq!(sim.fills[0].price, 0.6);
    }

    #[test]
    fn gapped_target_fills_at_open() {
        let candles = vec![
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 2.5, 2.6, 2.4, 2.5),
        ];
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let sim = simulate_exit_plan(&candles, 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills[0].reason, ExitReason::Target);
        assert_eq!(sim.fills[0].price, 2.5);
        // residual runs to the end of the series
        assert_eq!(sim.fills[1].reason, ExitReason::SeriesEnd);
    }

    #[test]
    fn time_exit_fills_at_open_after_deadline() {
        let plan = ExitPlan {
            time_exit: Some(TimeExitConfig { max_hold_secs: 120 }),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills.len(), 1);
        assert_eq!(sim.fills[0].reason, ExitReason::Time);
        assert_eq!(sim.fills[0].candle_index, 2);
        assert_eq!(sim.fills[0].price, 1.4);
    }

    #[test]
    fn min_hold_suppresses_early_signal() {
        let plan = ExitPlan {
            min_hold_secs: 120,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let candles = pump_and_fade();
        let signal = vec![false, true, false, true, false, false, false];
        let start = WalkStart {
            entry_ts_ms: 0,
            entry_px: 1.0,
            eval_from: 0,
            deadline_ms: None,
        };
        let sim = walk_exit_plan(&candles, &start, &plan, &signal, &FeeConfig::zero())
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills.len(), 1);
        assert_eq!(sim.fills[0].reason, ExitReason::Signal);
        assert_eq!(sim.fills[0].candle_index, 3);
        assert_eq!(sim.fills[0].price, 2.15);
    }

    #[test]
    fn series_end_closes_residual_at_last_close() {
        let plan = ExitPlan::default().validate().unwrap();
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.exit_reason, ExitReason::SeriesEnd);
        assert_eq!(sim.fills[0].candle_index, 6);
        assert_eq!(sim.fills[0].price, 1.5);
    }

    #[test]
    fn walk_past_last_candle_still_closes() {
        let plan = ExitPlan::default().validate().unwrap();
        let candles = pump_and_fade();
        let start = WalkStart {
            entry_ts_ms: 360_000,
            entry_px: 1.5,
            eval_from: candles.len(),
            deadline_ms: None,
        };
        let sim = walk_exit_plan(&candles, &start, &plan, &[], &FeeConfig::zero())
            .into_closed()
            .unwrap();
        assert_eq!(sim.exit_reason, ExitReason::SeriesEnd);
        assert_eq!(sim.filled_fraction(), 1.0);
    }

    #[test]
    fn immediate_activation_trails_from_entry() {
        let plan = ExitPlan {
            trailing: Some(TrailingStopConfig {
                enabled: true,
                trail_bps: 1000.0,
                activation: TrailingActivation::Immediate,
                hard_stop_bps: None,
                intrabar_policy: IntrabarPolicy::StopFirst,
            }),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        // mark 2.2 after candle 3, stop 1.98; candle 4 low 1.9 trips it
        assert_eq!(sim.fills[0].reason, ExitReason::TrailingStop);
        assert_eq!(sim.fills[0].candle_index, 4);
        assert!((sim.fills[0].price - 1.98).abs() < 1e-9);
    }

    #[test]
    fn after_first_target_activation() {
        let plan = ExitPlan {
            ladder: vec![LadderLeg {
                target: 1.4,
                fraction: 0.25,
            }],
            trailing: Some(trailing(
                TrailingActivation::AfterFirstTarget,
                IntrabarPolicy::StopFirst,
            )),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &FeeConfig::zero())
            .unwrap()
            .into_closed()
            .unwrap();
        assert_eq!(sim.fills[0].reason, ExitReason::Target);
        assert_eq!(sim.fills[0].candle_index, 1);
        assert_eq!(sim.fills[1].reason, ExitReason::TrailingStop);
        assert!((sim.fills[1].price - 1.87).abs() < 1e-9);
        assert!((sim.filled_fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fees_reduce_net_return() {
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let fees = FeeConfig {
            entry_fee_bps: 100.0,
            exit_fee_bps: 100.0,
            slippage_bps: 50.0,
        };
        let sim = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &fees)
            .unwrap()
            .into_closed()
            .unwrap();
        assert!((sim.net_entry_px - 1.015).abs() < 1e-12);
        assert!(sim.net_return_pct < sim.gross_return_pct);
        assert!((sim.fills[0].net_price - 2.0 * 0.985).abs() < 1e-12);
    }

    #[test]
    fn nan_candle_is_rejected_before_walk() {
        let mut candles = pump_and_fade();
        candles[1] = Candle::new(60, 0.5, f64::NAN, f64::NAN, 0.5, 1000.0);
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let err = simulate_exit_plan(&candles, 0, 1.0, &plan, &FeeConfig::zero()).unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidCandles(CandleError::NotANumber { timestamp: 60 })
        );
    }

    #[test]
    fn ohlc_violation_is_rejected() {
        let mut candles = pump_and_fade();
        candles[2].high = 1.0;
        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let err = simulate_exit_plan(&candles, 0, 1.0, &plan, &FeeConfig::zero()).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidCandles(CandleError::OhlcViolation { timestamp: 120, .. })
        ));
    }

    #[test]
    fn fee_config_validation() {
        assert!(FeeConfig::zero().validate().is_ok());
        let negative = FeeConfig {
            exit_fee_bps: -5.0,
            ..FeeConfig::zero()
        };
        assert!(matches!(
            negative.validate(),
            Err(ExecutionConfigError::NegativeBps { field: "exit_fee_bps", .. })
        ));
        let nan = FeeConfig {
            slippage_bps: f64::NAN,
            ..FeeConfig::zero()
        };
        assert!(nan.validate().is_err());
        let wipes_out_exit = FeeConfig {
            exit_fee_bps: 6_000.0,
            slippage_bps: 4_000.0,
            ..FeeConfig::zero()
        };
        assert!(matches!(
            wipes_out_exit.validate(),
            Err(ExecutionConfigError::BpsTooLarge { .. })
        ));

        let plan = ladder_plan(IntrabarPolicy::StopFirst);
        let err = simulate_exit_plan(&pump_and_fade(), 0, 1.0, &plan, &negative).unwrap_err();
        assert!(matches!(err, SimError::Execution(_)));
    }
}
