//! Ichimoku tenkan-sen / kijun-sen.
//!
//! tenkan[t] = (max(high[t-tp+1..=t]) + min(low[t-tp+1..=t])) / 2
//! kijun[t]  = same over the kijun period.
//! Both lines are NaN until max(tenkan_period, kijun_period) candles have been observed,
//! so a tenkan/kijun comparison never sees one line without the other.

use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct Ichimoku {
    pub tenkan: Vec<f64>,
    pub kijun: Vec<f64>,
}

pub fn ichimoku(candles: &[Candle], tenkan_period: usize, kijun_period: usize) -> Ichimoku {
    let n = candles.len();
    let mut tenkan = vec![f64::NAN; n];
    let mut kijun = vec![f64::NAN; n];

    if tenkan_period == 0 || kijun_period == 0 {
        return Ichimoku { tenkan, kijun };
    }

    let warmup = tenkan_period.max(kijun_period);
    if n < warmup {
        return Ichimoku { tenkan, kijun };
    }

    for i in (warmup - 1)..n {
        tenkan[i] = midpoint(&candles[i + 1 - tenkan_period..=i]);
        kijun[i] = midpoint(&candles[i + 1 - kijun_period..=i]);
    }

    Ichimoku { tenkan, kijun }
}

fn midpoint(window: &[Candle]) -> f64 {
    let mut highest = f64::NEG_INFINITY;
    let mut lowest = f64::INFINITY;
    for c in window {
        if c.high.is_nan() || c.low.is_nan() {
            return f64::NAN;
        }
        highest = highest.max(c.high);
        lowest = lowest.min(c.low);
    }
    (highest + lowest) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn warmup_uses_longer_period() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let ich = ichimoku(&candles, 2, 4);
        for i in 0..3 {
            assert!(ich.tenkan[i].is_nan(), "tenkan defined during warmup at {i}");
            assert!(ich.kijun[i].is_nan());
        }
        assert!(!ich.tenkan[3].is_nan());
        assert!(!ich.kijun[3].is_nan());
    }

    #[test]
    fn known_midpoints() {
        // make_candles: high = max(open, close) + 1, low = min(open, close) - 1
        // Index 3: open 12, close 13 → high 14, low 11; index 2: open 11, close 12 → high 13, low 10
        // tenkan(2) at 3 = (14 + 10) / 2 = 12
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        let ich = ichimoku(&candles, 2, 3);
        assert_approx(ich.tenkan[3], 12.0, DEFAULT_EPSILON);
        // kijun(3) at 3: highs 12,13,14, lows 9,10,11 → (14 + 9) / 2 = 11.5
        assert_approx(ich.kijun[3], 11.5, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_period_degrades_to_no_signal() {
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let ich = ichimoku(&candles, 0, 2);
        assert!(ich.tenkan.iter().all(|v| v.is_nan()));
        assert!(ich.kijun.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn output_length_matches_input() {
        let candles = make_candles(&[1.0; 7]);
        let ich = ichimoku(&candles, 9, 26);
        assert_eq!(ich.tenkan.len(), 7);
        assert_eq!(ich.kijun.len(), 7);
    }
}
