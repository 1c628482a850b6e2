//! Candle-set quality metrics: coverage and a bounded defect score.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Linear, capped penalty per defect class.
///
/// Caps keep each penalty bounded before the final clamp, so the score is
/// monotone non-increasing in every defect count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPenalties {
    pub gap_weight: f64,
    pub gap_cap: f64,
    pub duplicate_weight: f64,
    pub duplicate_cap: f64,
    pub distortion_weight: f64,
    pub distortion_cap: f64,
}

impl Default for QualityPenalties {
    fn default() -> Self {
        Self {
            gap_weight: 0.5,
            gap_cap: 40.0,
            duplicate_weight: 1.0,
            duplicate_cap: 30.0,
            distortion_weight: 2.0,
            distortion_cap: 30.0,
        }
    }
}

impl QualityPenalties {
    fn penalty(count: usize, weight: f64, cap: f64) -> f64 {
        (count as f64 * weight.max(0.0)).min(cap.max(0.0))
    }

    pub fn total(&self, gaps: usize, duplicates: usize, distortions: usize) -> f64 {
        Self::penalty(gaps, self.gap_weight, self.gap_cap)
            + Self::penalty(duplicates, self.duplicate_weight, self.duplicate_cap)
            + Self::penalty(distortions, self.distortion_weight, self.distortion_cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// `total_candles / expected_candles`, in `[0, 1]`.
    pub coverage: f64,
    /// In `[0, 100]`.
    pub quality_score: f64,
    pub gaps: usize,
    pub duplicates: usize,
    pub distortions: usize,
    pub total_candles: usize,
    pub expected_candles: usize,
}

impl QualityMetrics {
    pub fn from_counts(
        total_candles: usize,
        expected_candles: usize,
        gaps: usize,
        duplicates: usize,
        distortions: usize,
    ) -> Self {
        Self::from_counts_with(
            total_candles,
            expected_candles,
            gaps,
            duplicates,
            distortions,
            &QualityPenalties::default(),
        )
    }

    pub fn from_counts_with(
        total_candles: usize,
        expected_candles: usize,
        gaps: usize,
        duplicates: usize,
        distortions: usize,
        penalties: &QualityPenalties,
    ) -> Self {
        let coverage = if expected_candles == 0 {
            0.0
        } else {
            (total_candles as f64 / expected_candles as f64).min(1.0)
        };
        let quality_score =
            (100.0 - penalties.total(gaps, duplicates, distortions)).clamp(0.0, 100.0);
        Self {
            coverage,
            quality_score,
            gaps,
            duplicates,
            distortions,
            total_candles,
            expected_candles,
        }
    }
}

/// Half-open time window `[start_ts, end_ts)` in unix seconds, sliced into
/// `interval_secs` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWindow {
    pub start_ts: i64,
    pub end_ts: i64,
    pub interval_secs: i64,
}

impl QualityWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            start_ts: start.timestamp(),
            end_ts: end.timestamp(),
            interval_secs: interval.num_seconds(),
        }
    }

    /// Window from the first candle through one interval past the last.
    pub fn covering(candles: &[Candle], interval_secs: i64) -> Option<Self> {
        let first = candles.first()?;
        let last = candles.last()?;
        Some(Self {
            start_ts: first.timestamp,
            end_ts: last.timestamp.saturating_add(interval_secs),
            interval_secs,
        })
    }

    pub fn expected_candles(&self) -> usize {
        if self.interval_secs <= 0 || self.end_ts <= self.start_ts {
            return 0;
        }
        ((self.end_ts - self.start_ts) / self.interval_secs) as usize
    }

    /// True for timestamps in a whole slot; a trailing partial slot is outside the grid.
    fn contains(&self, ts: i64) -> bool {
        let grid_end = self.start_ts + self.expected_candles() as i64 * self.interval_secs;
        ts >= self.start_ts && ts < grid_end
    }

    fn slot(&self, ts: i64) -> i64 {
        (ts - self.start_ts) / self.interval_secs
    }
}

/// Count gaps, duplicates and distorted candles inside `window`.
///
/// Candles outside the window, or in a trailing partial slot, are ignored. A duplicate is a second candle in
/// an already-filled slot; a distortion is a candle failing OHLC sanity. Gaps
/// are expected slots with no candle.
pub fn calculate_quality_metrics(candles: &[Candle], window: &QualityWindow) -> QualityMetrics {
    let expected = window.expected_candles();
    if expected == 0 {
        return QualityMetrics::from_counts(0, 0, 0, 0, 0);
    }

    let mut slots = BTreeSet::new();
    let mut duplicates = 0;
    let mut distortions = 0;
    for candle in candles.iter().filter(|c| window.contains(c.timestamp)) {
        if !candle.is_sane() {
            distortions += 1;
        }
        if !slots.insert(window.slot(candle.timestamp)) {
            duplicates += 1;
        }
    }

    let filled = slots.len();
    QualityMetrics::from_counts(filled, expected, expected - filled, duplicates, distortions)
}
