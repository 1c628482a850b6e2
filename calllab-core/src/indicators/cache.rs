//! Per-simulation indicator cache.
//!
//! Scoped to a single simulation invocation: the cache is an owned value,
//! never global state, so concurrent simulations cannot see each other's
//! series. Entries are keyed by an approximate content key of the candle
//! slice (endpoints, length, one price sample) plus the indicator spec. The
//! key only has to separate the slices seen within one invocation, which all
//! come from the same candle set. Eviction is FIFO once `capacity` entries
//! are held.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::Candle;

use super::{ema_of_closes, ichimoku, rsi_of_closes, volume_zscore};

/// Approximate content key of a candle slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub first_ts: i64,
    pub last_ts: i64,
    pub len: usize,
    /// Bit pattern of the middle candle's close.
    pub price_sample: u64,
}

impl SeriesKey {
    pub fn of(candles: &[Candle]) -> Self {
        let first_ts = candles.first().map(|c| c.timestamp).unwrap_or(0);
        let last_ts = candles.last().map(|c| c.timestamp).unwrap_or(0);
        let price_sample = candles
            .get(candles.len() / 2)
            .map(|c| c.close.to_bits())
            .unwrap_or(0);
        Self {
            first_ts,
            last_ts,
            len: candles.len(),
            price_sample,
        }
    }
}

/// Which derived series to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorSpec {
    Ema { period: usize },
    Rsi { period: usize },
    Tenkan { tenkan: usize, kijun: usize },
    Kijun { tenkan: usize, kijun: usize },
    VolumeZScore { window: usize },
}

impl IndicatorSpec {
    pub fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        match *self {
            IndicatorSpec::Ema { period } => ema_of_closes(candles, period),
            IndicatorSpec::Rsi { period } => rsi_of_closes(candles, period),
            IndicatorSpec::Tenkan { tenkan, kijun } => ichimoku(candles, tenkan, kijun).tenkan,
            IndicatorSpec::Kijun { tenkan, kijun } => ichimoku(candles, tenkan, kijun).kijun,
            IndicatorSpec::VolumeZScore { window } => volume_zscore(candles, window),
        }
    }
}

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct IndicatorCache {
    capacity: usize,
    entries: HashMap<(SeriesKey, IndicatorSpec), Arc<Vec<f64>>>,
    order: VecDeque<(SeriesKey, IndicatorSpec)>,
    hits: u64,
    misses: u64,
}

impl Default for IndicatorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl IndicatorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Fetch the series for `spec` over `candles`, computing it on a miss.
    pub fn series(&mut self, candles: &[Candle], spec: IndicatorSpec) -> Arc<Vec<f64>> {
        let key = (SeriesKey::of(candles), spec);
        if let Some(series) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(series);
        }

        self.misses += 1;
        let series = Arc::new(spec.compute(candles));
        debug_assert_eq!(series.len(), candles.len());

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, Arc::clone(&series));
        self.order.push_back(key);
        series
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
