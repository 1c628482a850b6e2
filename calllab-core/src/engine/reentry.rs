//! Re-entry state machine.
//!
//! `Idle → Waiting` after a stop-triggered exit (if re-entries remain and the
//! mode is not `None`); `Waiting → Idle` when a later candle's low reaches the
//! trigger (emitting a request) or on explicit cancellation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Candle;
use crate::plan::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReEntryMode {
    #[default]
    None,
    /// Re-enter once price retraces `fraction` below the exit reference price.
    Retrace { fraction: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReEntryConfig {
    pub mode: ReEntryMode,
    pub max_reentries: u32,
    /// Re-entry size as a share of the original position.
    pub size_fraction: f64,
}

impl Default for ReEntryConfig {
    fn default() -> Self {
        Self {
            mode: ReEntryMode::None,
            max_reentries: 0,
            size_fraction: 1.0,
        }
    }
}

impl ReEntryConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        if let ReEntryMode::Retrace { fraction } = self.mode {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(PlanError::RetraceFraction(fraction));
            }
        }
        if !(self.size_fraction > 0.0 && self.size_fraction <= 1.0) {
            return Err(PlanError::SizeFraction(self.size_fraction));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, ReEntryMode::None) && self.max_reentries > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReEntryPhase {
    Idle,
    Waiting,
}

/// Mutable per-run state. Owned by exactly one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReEntryState {
    pub phase: ReEntryPhase,
    pub trigger_price: f64,
    pub reference_price: f64,
    /// Candle of the exit that started the wait.
    pub exit_index: usize,
    pub count: u32,
}

impl Default for ReEntryState {
    fn default() -> Self {
        Self {
            phase: ReEntryPhase::Idle,
            trigger_price: 0.0,
            reference_price: 0.0,
            exit_index: 0,
            count: 0,
        }
    }
}

/// Emitted when a waiting machine triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReEntryRequest {
    pub price: f64,
    pub size_fraction: f64,
    pub candle_index: usize,
    /// Exit that started the wait.
    pub exit_index: usize,
}

#[derive(Debug, Clone)]
pub struct ReEntryMachine {
    config: ReEntryConfig,
    state: ReEntryState,
}

impl ReEntryMachine {
    pub fn new(config: ReEntryConfig) -> Self {
        Self {
            config,
            state: ReEntryState::default(),
        }
    }

    pub fn state(&self) -> &ReEntryState {
        &self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state.phase == ReEntryPhase::Waiting
    }

    /// Offer a stop-triggered exit. Returns true if the machine starts waiting.
    pub fn on_exit(&mut self, reference_price: f64, exit_index: usize) -> bool {
        let ReEntryMode::Retrace { fraction } = self.config.mode else {
            return false;
        };
        if self.state.phase != ReEntryPhase::Idle || self.state.count >= self.config.max_reentries {
            return false;
        }
        self.state.phase = ReEntryPhase::Waiting;
        self.state.reference_price = reference_price;
        self.state.trigger_price = reference_price * (1.0 - fraction);
        self.state.exit_index = exit_index;
        debug!(
            reference_price,
            trigger_price = self.state.trigger_price,
            exit_index,
            "re-entry waiting"
        );
        true
    }

    /// Feed a candle after the exit. Triggers on `low ≤ trigger_price`.
    pub fn on_candle(&mut self, index: usize, candle: &Candle) -> Option<ReEntryRequest> {
        if self.state.phase != ReEntryPhase::Waiting || index <= self.state.exit_index {
            return None;
        }
        if candle.low > self.state.trigger_price {
            return None;
        }
        self.state.phase = ReEntryPhase::Idle;
        self.state.count += 1;
        debug!(
            candle_index = index,
            price = self.state.trigger_price,
            count = self.state.count,
            "re-entry triggered"
        );
        Some(ReEntryRequest {
            price: self.state.trigger_price,
            size_fraction: self.config.size_fraction,
            candle_index: index,
            exit_index: self.state.exit_index,
        })
    }

    /// Stop waiting without consuming a re-entry.
    pub fn cancel(&mut self) {
        if self.state.phase == ReEntryPhase::Waiting {
            debug!(exit_index = self.state.exit_index, "re-entry cancelled");
        }
        self.state.phase = ReEntryPhase::Idle;
    }
}

/// A re-entry is invalid if any candle strictly between the exit and the
/// re-entry candle traded at or below `stop_loss_price`.
pub fn validate_reentry_sequence(
    candles: &[Candle],
    exit_index: usize,
    reentry_index: usize,
    stop_loss_price: f64,
) -> bool {
    if reentry_index <= exit_index + 1 {
        return true;
    }
    let end = reentry_index.min(candles.len());
    let start = (exit_index + 1).min(end);
    candles[start..end]
        .iter()
        .all(|c| c.low > stop_loss_price)
}
