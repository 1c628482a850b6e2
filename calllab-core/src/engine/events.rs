//! Simulation event trace.
//!
//! Every decision a backtest makes is appended here in order. The serialized
//! trace is what the determinism hash covers, so anything that can differ
//! between two runs must show up in an event.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitFill, ExitReason};
use crate::execution::ExecutionResult;

use super::exit_stack::NoTradeReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    EntryExecuted {
        walk: u32,
        candle_index: usize,
        requested_price: f64,
        requested_quantity: f64,
        result: ExecutionResult,
    },
    ExitTriggered {
        walk: u32,
        fill: ExitFill,
    },
    ExitExecuted {
        walk: u32,
        candle_index: usize,
        reason: ExitReason,
        requested_price: f64,
        requested_quantity: f64,
        result: ExecutionResult,
    },
    /// Quantity left after the last exit fill, marked to the last close.
    ResidualMarked {
        walk: u32,
        candle_index: usize,
        price: f64,
        quantity: f64,
    },
    ReEntryWaiting {
        walk: u32,
        exit_index: usize,
        reference_price: f64,
        trigger_price: f64,
    },
    ReEntryTriggered {
        walk: u32,
        candle_index: usize,
        price: f64,
        size_fraction: f64,
    },
    ReEntryRejected {
        candle_index: usize,
        exit_index: usize,
        stop_loss_price: f64,
    },
    ReEntryCancelled {
        candle_index: usize,
    },
    NoTrade {
        reason: NoTradeReason,
    },
}

impl SimEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::EntryExecuted { .. } => "entry_executed",
            SimEvent::ExitTriggered { .. } => "exit_triggered",
            SimEvent::ExitExecuted { .. } => "exit_executed",
            SimEvent::ResidualMarked { .. } => "residual_marked",
            SimEvent::ReEntryWaiting { .. } => "re_entry_waiting",
            SimEvent::ReEntryTriggered { .. } => "re_entry_triggered",
            SimEvent::ReEntryRejected { .. } => "re_entry_rejected",
            SimEvent::ReEntryCancelled { .. } => "re_entry_cancelled",
            SimEvent::NoTrade { .. } => "no_trade",
        }
    }
}
