//! Volume z-score.
//!
//! z[t] = (volume[t] - mean(volume[t-w+1..=t])) / stddev(volume[t-w+1..=t])
//! Population standard deviation over the trailing window, current candle included.
//! NaN during warmup (t < w - 1) and wherever the window's stddev is zero.

use crate::domain::Candle;

pub fn volume_zscore(candles: &[Candle], window: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &candles[i + 1 - window..=i];
        let mean = slice.iter().map(|c| c.volume).sum::<f64>() / window as f64;
        let variance = slice
            .iter()
            .map(|c| (c.volume - mean).powi(2))
            .sum::<f64>()
            / window as f64;
        let stddev = variance.sqrt();
        if stddev > 0.0 && stddev.is_finite() {
            result[i] = (candles[i].volume - mean) / stddev;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn with_volumes(volumes: &[f64]) -> Vec<Candle> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| Candle::new(i as i64 * 60, 1.0, 1.1, 0.9, 1.0, v))
            .collect()
    }

    #[test]
    fn constant_volume_is_undefined() {
        let candles = with_volumes(&[100.0; 6]);
        let z = volume_zscore(&candles, 3);
        assert!(z.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn spike_scores_high() {
        // Window [100, 100, 400]: mean 200, stddev sqrt((1e4 + 1e4 + 4e4) / 3) = sqrt(2e4)
        let candles = with_volumes(&[100.0, 100.0, 400.0]);
        let z = volume_zscore(&candles, 3);
        assert!(z[0].is_nan());
        assert!(z[1].is_nan());
        assert_approx(z[2], 200.0 / 20_000f64.sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn zero_window_degrades_to_no_signal() {
        let candles = with_volumes(&[1.0, 2.0, 3.0]);
        assert!(volume_zscore(&candles, 0).iter().all(|v| v.is_nan()));
    }
}
