//! Trade: a completed exit walk with profit/loss accounting.

use super::fill::ExitReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the call being simulated (one token, one caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallContext {
    pub call_id: String,
    pub token: String,
    pub chain: String,
    pub caller: String,
}

impl CallContext {
    pub fn new(
        call_id: impl Into<String>,
        token: impl Into<String>,
        chain: impl Into<String>,
        caller: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            token: token.into(),
            chain: chain.into(),
            caller: caller.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub ts_ms: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub ts_ms: i64,
    /// Quantity-weighted average of the idealised exit prices.
    pub price: f64,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradePnl {
    /// Return on idealised entry/exit prices, in percent.
    pub gross_return_pct: f64,
    /// Return on executed prices after fees, in percent.
    pub net_return_pct: f64,
    /// Informational: fees already reflected in `net_return_pct`.
    pub fees_usd: f64,
    /// Informational: adverse price difference already reflected in `net_return_pct`.
    pub slippage_usd: f64,
}

/// One completed exit walk. Immutable once produced.
///
/// `walk` is 0 for the original entry and n for the n-th re-entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub call_id: String,
    pub token: String,
    pub chain: String,
    pub caller: String,
    pub walk: u32,
    /// Size of this walk as a fraction of the original position.
    pub size_fraction: f64,
    pub entry: TradeEntry,
    pub exit: TradeExit,
    pub pnl: TradePnl,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl.net_return_pct > 0.0
    }

    pub fn is_reentry(&self) -> bool {
        self.walk > 0
    }

    pub fn hold_ms(&self) -> i64 {
        self.exit.ts_ms - self.entry.ts_ms
    }

    pub fn entry_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.entry.ts_ms)
    }

    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exit.ts_ms)
    }
}
