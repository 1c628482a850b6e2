//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle for a single token on a single interval.
///
/// Timestamps are unix seconds. A candle sequence handed to the simulation
/// core is sorted ascending and deduplicated by timestamp upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Timestamp in unix milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.saturating_mul(1000)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// OHLC sanity: high bounds every price, low is bounded by every price, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }

    /// Check a single candle, reporting which invariant failed.
    pub fn check(&self) -> Result<(), CandleError> {
        if self.is_void() {
            return Err(CandleError::NotANumber {
                timestamp: self.timestamp,
            });
        }
        if self.low <= 0.0 || self.volume < 0.0 {
            return Err(CandleError::NonPositive {
                timestamp: self.timestamp,
            });
        }
        if !self.is_sane() {
            return Err(CandleError::OhlcViolation {
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("candle at {timestamp} has a NaN field")]
    NotANumber { timestamp: i64 },

    #[error("candle at {timestamp} has a non-positive price or negative volume")]
    NonPositive { timestamp: i64 },

    #[error("candle at {timestamp} violates OHLC bounds (o={open}, h={high}, l={low}, c={close})")]
    OhlcViolation {
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("candle timestamps not strictly ascending at index {index} ({previous} -> {current})")]
    NotAscending {
        index: usize,
        previous: i64,
        current: i64,
    },
}

/// Validate a candle sequence before it is simulated.
///
/// Every candle must pass [`Candle::check`] and timestamps must be strictly
/// ascending (which also rules out duplicates).
pub fn validate_candles(candles: &[Candle]) -> Result<(), CandleError> {
    for (i, candle) in candles.iter().enumerate() {
        candle.check()?;
        if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
            return Err(CandleError::NotAscending {
                index: i,
                previous: candles[i - 1].timestamp,
                current: candle.timestamp,
            });
        }
    }
    Ok(())
}
