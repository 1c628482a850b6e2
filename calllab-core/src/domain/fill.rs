use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an exit fill happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// A ladder take-profit leg reached its target.
    Target,
    /// The trailing stop (above the hard stop) was hit.
    TrailingStop,
    /// The hard stop floor was hit.
    HardStop,
    /// The indicator exit fired.
    Signal,
    /// Maximum hold elapsed.
    Time,
    /// Candles ran out with quantity still open.
    SeriesEnd,
}

impl ExitReason {
    /// Stop-triggered closes are the ones offered to the re-entry machine.
    pub fn is_stop(&self) -> bool {
        matches!(self, ExitReason::TrailingStop | ExitReason::HardStop)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Target => "target",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::HardStop => "hard_stop",
            ExitReason::Signal => "signal",
            ExitReason::Time => "time",
            ExitReason::SeriesEnd => "series_end",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single exit fill produced by the exit plan evaluator.
///
/// `fraction` is expressed against the size of the position being walked
/// (1.0 = the whole position). `price` is the idealised trigger price and
/// `net_price` the same price after the evaluator's fee/slippage haircut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub ts_ms: i64,
    pub candle_index: usize,
    pub price: f64,
    pub net_price: f64,
    pub fraction: f64,
    pub reason: ExitReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reasons() {
        assert!(ExitReason::TrailingStop.is_stop());
        assert!(ExitReason::HardStop.is_stop());
        assert!(!ExitReason::Target.is_stop());
        assert!(!ExitReason::Time.is_stop());
        assert!(!ExitReason::SeriesEnd.is_stop());
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::SeriesEnd).unwrap();
        assert_eq!(json, "\"series_end\"");
        assert_eq!(ExitReason::TrailingStop.to_string(), "trailing_stop");
    }
}
