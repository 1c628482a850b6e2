//! Technical indicator library.
//!
//! Pure functions: candle history in, derived series of equal length out.
//! Warmup values are `f64::NAN`. A malformed period (0) never panics; it
//! yields an all-NaN series, which every rule treats as "no signal".
//!
//! Series are precomputed once per simulation (through [`IndicatorCache`])
//! and queried by candle index during the exit walk.

pub mod cache;
pub mod cross;
pub mod ema;
pub mod ichimoku;
pub mod rsi;
pub mod volume_zscore;

pub use cache::{IndicatorCache, IndicatorSpec, SeriesKey};
pub use cross::{crossed, crossed_at, crossed_level_at, CrossDirection};
pub use ema::{ema, ema_of_closes};
pub use ichimoku::{ichimoku, Ichimoku};
pub use rsi::{rsi, rsi_of_closes};
pub use volume_zscore::volume_zscore;

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000,
/// one-minute spacing.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: 1_700_000_000 + i as i64 * 60,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
