//! Simulation engine: exit-stack evaluator and the call backtest driver.
//!
//! Two entry points:
//!
//! 1. [`simulate_exit_plan`]: one idealised walk with flat bps costs, the fast
//!    path used for plan search.
//! 2. [`backtest_exit_stack`]: walks routed through an execution model, with
//!    stop-out re-entries and a hashed event trace.
//!
//! Per-candle evaluation order: time exit, indicator exit, stops (per
//! intrabar policy), ladder targets, then the trailing update.

pub mod backtest;
pub mod events;
pub mod exit_stack;
pub mod ratchet;
pub mod reentry;
pub mod trade_extraction;

pub use backtest::{backtest_exit_stack, BacktestInputs, BacktestOutcome, SimError};
pub use events::SimEvent;
pub use exit_stack::{
    entry_index, precompute_signal, simulate_exit_plan, walk_exit_plan, ExitOutcome,
    ExitSimulation, FeeConfig, NoTradeReason, PositionState, WalkStart,
};
pub use ratchet::{RatchetState, TrailingState};
pub use reentry::{
    validate_reentry_sequence, ReEntryConfig, ReEntryMachine, ReEntryMode, ReEntryPhase,
    ReEntryRequest, ReEntryState,
};
pub use trade_extraction::{
    summarize, trade_from_execution, trade_from_simulation, TradeSummary, WalkCosts,
};
