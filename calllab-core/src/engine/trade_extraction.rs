//! Trade extraction: converts a completed exit walk into a `Trade`.
//!
//! Pure functions: exit simulation + costs → trade record. Gross return always
//! comes from the idealised walk prices. Net return is computed once, from
//! executed prices and fees; `fees_usd` and `slippage_usd` are informational
//! breakdowns of the same costs and must not be subtracted again.

use serde::{Deserialize, Serialize};

use crate::domain::{CallContext, Trade, TradeEntry, TradeExit, TradePnl};

use super::exit_stack::{ExitSimulation, FeeConfig};

/// Executed costs of one walk, collected by the backtest driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WalkCosts {
    /// Tokens bought.
    pub quantity: f64,
    /// Executed entry notional (price × quantity), fees excluded.
    pub entry_notional: f64,
    pub entry_fee: f64,
    /// Executed exit notional plus any residual marked at the last close.
    pub exit_proceeds: f64,
    pub exit_fees: f64,
    /// Adverse execution vs. idealised prices, entry and exits combined.
    pub slippage_usd: f64,
}

impl WalkCosts {
    pub fn total_fees(&self) -> f64 {
        self.entry_fee + self.exit_fees
    }

    pub fn net_return_pct(&self) -> f64 {
        let cost = self.entry_notional + self.entry_fee;
        if cost <= 0.0 {
            return 0.0;
        }
        ((self.exit_proceeds - self.exit_fees) / cost - 1.0) * 100.0
    }
}

fn base_trade(call: &CallContext, walk: u32, size_fraction: f64, sim: &ExitSimulation) -> Trade {
    Trade {
        call_id: call.call_id.clone(),
        token: call.token.clone(),
        chain: call.chain.clone(),
        caller: call.caller.clone(),
        walk,
        size_fraction,
        entry: TradeEntry {
            ts_ms: sim.entry_ts_ms,
            price: sim.entry_px,
        },
        exit: TradeExit {
            ts_ms: sim.exit_ts_ms,
            price: sim.exit_px_vwap,
            reason: sim.exit_reason,
        },
        pnl: TradePnl {
            gross_return_pct: sim.gross_return_pct,
            ..Default::default()
        },
    }
}

/// Trade for a walk routed through an execution model.
pub fn trade_from_execution(
    call: &CallContext,
    walk: u32,
    size_fraction: f64,
    sim: &ExitSimulation,
    costs: &WalkCosts,
) -> Trade {
    let mut trade = base_trade(call, walk, size_fraction, sim);
    trade.pnl.net_return_pct = costs.net_return_pct();
    trade.pnl.fees_usd = costs.total_fees();
    trade.pnl.slippage_usd = costs.slippage_usd;
    trade
}

/// Trade for the fast evaluator path, where costs are a flat [`FeeConfig`].
///
/// The USD breakdown is derived from `position_size_usd` and the fee split.
pub fn trade_from_simulation(
    call: &CallContext,
    sim: &ExitSimulation,
    fees: &FeeConfig,
    position_size_usd: f64,
) -> Trade {
    let mut trade = base_trade(call, 0, 1.0, sim);
    trade.pnl.net_return_pct = sim.net_return_pct;

    let quantity = position_size_usd / sim.entry_px;
    let exit_notional: f64 = sim
        .fills
        .iter()
        .map(|f| f.price * f.fraction * quantity)
        .sum();
    trade.pnl.fees_usd = position_size_usd * fees.entry_fee_bps / 10_000.0
        + exit_notional * fees.exit_fee_bps / 10_000.0;
    trade.pnl.slippage_usd = (position_size_usd + exit_notional) * fees.slippage_bps / 10_000.0;
    trade
}

/// Aggregate view over a set of trades.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeSummary {
    pub trades: usize,
    pub winners: usize,
    pub reentries: usize,
    pub win_rate: f64,
    pub mean_net_return_pct: f64,
    pub best_net_return_pct: f64,
    pub worst_net_return_pct: f64,
    pub total_fees_usd: f64,
}

pub fn summarize(trades: &[Trade]) -> TradeSummary {
    if trades.is_empty() {
        return TradeSummary::default();
    }
    let n = trades.len();
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    let returns = trades.iter().map(|t| t.pnl.net_return_pct);
    TradeSummary {
        trades: n,
        winners,
        reentries: trades.iter().filter(|t| t.is_reentry()).count(),
        win_rate: winners as f64 / n as f64,
        mean_net_return_pct: returns.clone().sum::<f64>() / n as f64,
        best_net_return_pct: returns.clone().fold(f64::NEG_INFINITY, f64::max),
        worst_net_return_pct: returns.fold(f64::INFINITY, f64::min),
        total_fees_usd: trades.iter().map(|t| t.pnl.fees_usd).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitFill, ExitReason};

    fn sim() -> ExitSimulation {
        ExitSimulation {
            entry_index: 0,
            entry_ts_ms: 0,
            entry_px: 1.0,
            net_entry_px: 1.0,
            fills: vec![
                ExitFill {
                    ts_ms: 60_000,
                    candle_index: 1,
                    price: 2.0,
                    net_price: 2.0,
                    fraction: 0.5,
                    reason: ExitReason::Target,
                },
                ExitFill {
                    ts_ms: 120_000,
                    candle_index: 2,
                    price: 1.5,
                    net_price: 1.5,
                    fraction: 0.5,
                    reason: ExitReason::TrailingStop,
                },
            ],
            exit_ts_ms: 120_000,
            exit_px_vwap: 1.75,
            net_exit_px_vwap: 1.75,
            exit_reason: ExitReason::TrailingStop,
            gross_return_pct: 75.0,
            net_return_pct: 75.0,
        }
    }

    fn call() -> CallContext {
        CallContext::new("call-1", "TOKEN", "solana", "alice")
    }

    #[test]
    fn execution_costs_drive_net_return() {
        let costs = WalkCosts {
            quantity: 100.0,
            entry_notional: 100.0,
            entry_fee: 1.0,
            exit_proceeds: 175.0,
            exit_fees: 1.75,
            slippage_usd: 0.0,
        };
        let trade = trade_from_execution(&call(), 0, 1.0, &sim(), &costs);
        assert_eq!(trade.pnl.gross_return_pct, 75.0);
        let expected = ((175.0 - 1.75) / 101.0 - 1.0) * 100.0;
        assert!((trade.pnl.net_return_pct - expected).abs() < 1e-9);
        assert!((trade.pnl.fees_usd - 2.75).abs() < 1e-12);
        assert_eq!(trade.exit.reason, ExitReason::TrailingStop);
        assert_eq!(trade.exit.price, 1.75);
    }

    #[test]
    fn fee_config_breakdown_is_informational() {
        let fees = FeeConfig {
            entry_fee_bps: 100.0,
            exit_fee_bps: 100.0,
            slippage_bps: 0.0,
        };
        let trade = trade_from_simulation(&call(), &sim(), &fees, 100.0);
        // entry 1.00 + exits 1% of 175
        assert!((trade.pnl.fees_usd - 2.75).abs() < 1e-9);
        assert_eq!(trade.pnl.slippage_usd, 0.0);
        assert_eq!(trade.pnl.net_return_pct, 75.0);
    }

    #[test]
    fn summary_counts() {
        let costs = WalkCosts {
            entry_notional: 100.0,
            exit_proceeds: 80.0,
            ..Default::default()
        };
        let loser = trade_from_execution(&call(), 1, 0.5, &sim(), &costs);
        let winner = trade_from_execution(
            &call(),
            0,
            1.0,
            &sim(),
            &WalkCosts {
                entry_notional: 100.0,
                exit_proceeds: 150.0,
                ..Default::default()
            },
        );
        let summary = summarize(&[winner, loser]);
        assert_eq!(summary.trades, 2);
        assert_eq!(summary.winners, 1);
        assert_eq!(summary.reentries, 1);
        assert_eq!(summary.win_rate, 0.5);
        assert!((summary.best_net_return_pct - 50.0).abs() < 1e-9);
        assert!((summary.worst_net_return_pct + 20.0).abs() < 1e-9);
        assert_eq!(summarize(&[]), TradeSummary::default());
    }
}
