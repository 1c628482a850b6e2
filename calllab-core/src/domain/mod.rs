//! Domain types for the call simulation core

pub mod candle;
pub mod fill;
pub mod trade;

pub use candle::{validate_candles, Candle, CandleError};
pub use fill::{ExitFill, ExitReason};
pub use trade::{CallContext, Trade, TradeEntry, TradeExit, TradePnl};

/// Which side of the book a request takes. Positions are long-only, so a
/// `Buy` opens and a `Sell` closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}
