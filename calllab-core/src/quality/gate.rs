//! Quality gate: the checkpoint between candle ingestion and simulation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::metrics::QualityMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    pub min_coverage: f64,
    pub min_quality_score: f64,
    /// When false, violations are reported but never fatal.
    pub enforce: bool,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.95,
            min_quality_score: 80.0,
            enforce: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGate {
    Coverage,
    QualityScore,
}

impl fmt::Display for QualityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityGate::Coverage => write!(f, "coverage"),
            QualityGate::QualityScore => write!(f, "quality_score"),
        }
    }
}

/// A violated threshold, with the metrics that violated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{gate} gate failed: {actual} < {threshold}")]
pub struct QualityGateError {
    pub gate: QualityGate,
    pub threshold: f64,
    pub actual: f64,
    pub metrics: QualityMetrics,
}

/// Outcome of a gate check that did not fail hard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateReport {
    /// Violations tolerated because enforcement is off.
    pub violations: Vec<QualityGateError>,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

fn check(
    gate: QualityGate,
    threshold: f64,
    actual: f64,
    metrics: &QualityMetrics,
) -> Option<QualityGateError> {
    (actual < threshold).then(|| QualityGateError {
        gate,
        threshold,
        actual,
        metrics: *metrics,
    })
}

fn resolve(
    violations: Vec<QualityGateError>,
    config: &QualityGateConfig,
) -> Result<GateReport, QualityGateError> {
    if config.enforce {
        if let Some(first) = violations.into_iter().next() {
            return Err(first);
        }
        return Ok(GateReport::default());
    }
    for v in &violations {
        warn!(
            gate = %v.gate,
            threshold = v.threshold,
            actual = v.actual,
            "quality gate violated (not enforced)"
        );
    }
    Ok(GateReport { violations })
}

pub fn enforce_coverage_gate(
    metrics: &QualityMetrics,
    config: &QualityGateConfig,
) -> Result<GateReport, QualityGateError> {
    let violations = check(
        QualityGate::Coverage,
        config.min_coverage,
        metrics.coverage,
        metrics,
    )
    .into_iter()
    .collect();
    resolve(violations, config)
}

pub fn enforce_quality_gate(
    metrics: &QualityMetrics,
    config: &QualityGateConfig,
) -> Result<GateReport, QualityGateError> {
    let violations = check(
        QualityGate::QualityScore,
        config.min_quality_score,
        metrics.quality_score,
        metrics,
    )
    .into_iter()
    .collect();
    resolve(violations, config)
}

/// Coverage first, then quality score. With enforcement on, the first
/// violation is returned.
pub fn enforce_all_quality_gates(
    metrics: &QualityMetrics,
    config: &QualityGateConfig,
) -> Result<GateReport, QualityGateError> {
    let violations = [
        check(
            QualityGate::Coverage,
            config.min_coverage,
            metrics.coverage,
            metrics,
        ),
        check(
            QualityGate::QualityScore,
            config.min_quality_score,
            metrics.quality_score,
            metrics,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();
    resolve(violations, config)
}
