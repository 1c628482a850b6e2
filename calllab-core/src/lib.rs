//! CallLab Core: deterministic per-call backtesting of declarative exit plans.
//!
//! This crate contains the simulation core:
//! - Domain types (candles, exit fills, trades)
//! - Indicator library (EMA, RSI, Ichimoku, volume z-score, crossings)
//! - Exit plans, validated once before any simulation
//! - Exit-stack evaluator with explicit intrabar tie-break policy
//! - Re-entry state machine
//! - Execution reality model (latency, slippage, partial fills, failures, fees)
//! - Data quality metrics and gate
//! - Seed hierarchy and trace fingerprints for reproducibility
//!
//! The core performs no I/O and installs no tracing subscriber.

pub mod domain;
pub mod engine;
pub mod execution;
pub mod fingerprint;
pub mod indicators;
pub mod plan;
pub mod quality;
pub mod rng;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across batch worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::CallContext>();
        require_sync::<domain::CallContext>();

        // Plan types
        require_send::<plan::ValidatedPlan>();
        require_sync::<plan::ValidatedPlan>();
        require_send::<engine::ReEntryConfig>();
        require_sync::<engine::ReEntryConfig>();

        // Execution
        require_send::<execution::ExecutionModelConfig>();
        require_sync::<execution::ExecutionModelConfig>();
        require_send::<Box<dyn execution::ExecutionModel>>();
        require_sync::<Box<dyn execution::ExecutionModel>>();

        // Outputs
        require_send::<engine::BacktestOutcome>();
        require_sync::<engine::BacktestOutcome>();
        require_send::<quality::QualityMetrics>();
        require_sync::<quality::QualityMetrics>();
        require_send::<quality::QualityGateError>();
        require_sync::<quality::QualityGateError>();

        // Fingerprint and RNG
        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }

    /// The exit evaluator only accepts validated plans; an unvalidated
    /// `ExitPlan` cannot reach `simulate_exit_plan`.
    #[test]
    fn evaluator_requires_validated_plan() {
        fn _check(
            candles: &[domain::Candle],
            plan: &plan::ValidatedPlan,
        ) -> Result<engine::ExitOutcome, engine::SimError> {
            engine::simulate_exit_plan(candles, 0, 1.0, plan, &engine::FeeConfig::zero())
        }
    }
}
