//! Crossing detection between two series.

use serde::{Deserialize, Serialize};

/// Direction of a crossing of series A relative to series B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    /// A moves from at-or-below B to strictly above B.
    Bullish,
    /// A moves from at-or-above B to strictly below B.
    Bearish,
}

/// True exactly at the sample where the ordering of A vs. B flips in `direction`.
///
/// Any NaN input (warmup) yields false. Bullish requires `cur_a > cur_b` and
/// bearish requires `cur_a < cur_b`, so both can never hold for the same pair.
pub fn crossed(prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64, direction: CrossDirection) -> bool {
    if prev_a.is_nan() || prev_b.is_nan() || cur_a.is_nan() || cur_b.is_nan() {
        return false;
    }
    match direction {
        CrossDirection::Bullish => prev_a <= prev_b && cur_a > cur_b,
        CrossDirection::Bearish => prev_a >= prev_b && cur_a < cur_b,
    }
}

/// Cross of series `a` over series `b` at index `i` (false at index 0).
pub fn crossed_at(a: &[f64], b: &[f64], i: usize, direction: CrossDirection) -> bool {
    if i == 0 || i >= a.len() || i >= b.len() {
        return false;
    }
    crossed(a[i - 1], b[i - 1], a[i], b[i], direction)
}

/// Cross of series `a` over a constant `level` at index `i`.
pub fn crossed_level_at(a: &[f64], level: f64, i: usize, direction: CrossDirection) -> bool {
    if i == 0 || i >= a.len() {
        return false;
    }
    crossed(a[i - 1], level, a[i], level, direction)
}
