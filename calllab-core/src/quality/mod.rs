//! Data quality: metrics over a candle set and the gate that must pass before
//! a simulation is trusted.

pub mod gate;
pub mod metrics;

pub use gate::{
    enforce_all_quality_gates, enforce_coverage_gate, enforce_quality_gate, GateReport,
    QualityGate, QualityGateConfig, QualityGateError,
};
pub use metrics::{calculate_quality_metrics, QualityMetrics, QualityPenalties, QualityWindow};
