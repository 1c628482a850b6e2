//! Batch driver: quality gate then backtest, for many calls in parallel.
//!
//! Every call is fully independent: its own seeded RNG (derived from the
//! master seed and the call id), its own indicator cache, no shared mutable
//! state. Results come back in input order regardless of thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use calllab_core::domain::{CallContext, Candle, Trade};
use calllab_core::engine::{
    backtest_exit_stack, summarize, BacktestInputs, BacktestOutcome, TradeSummary,
};
use calllab_core::plan::ValidatedPlan;
use calllab_core::quality::{
    calculate_quality_metrics, enforce_all_quality_gates, GateReport, QualityGateError,
    QualityMetrics, QualityWindow,
};
use calllab_core::rng::RngHierarchy;

use crate::config::{ConfigError, SimulationConfig};

/// RNG scope for execution-model draws.
pub const EXECUTION_SCOPE: &str = "execution";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("quality gate aborted the batch at call {call_id}: {source}")]
    QualityGate {
        call_id: String,
        #[source]
        source: QualityGateError,
    },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One call to simulate: who called what, when, and the candles after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSpec {
    pub call: CallContext,
    pub entry_ts_ms: i64,
    /// Defaults to the entry candle's open.
    #[serde(default)]
    pub entry_px: Option<f64>,
    pub candles: Vec<Candle>,
    /// Expected candle window; derived from the candles when absent.
    #[serde(default)]
    pub window: Option<QualityWindow>,
    #[serde(default)]
    pub liquidity_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Completed {
        quality: QualityMetrics,
        gate: GateReport,
        backtest: BacktestOutcome,
    },
    Skipped {
        reason: String,
        quality: Option<QualityMetrics>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub call_id: String,
    pub seed: u64,
    pub outcome: CallOutcome,
}

impl CallResult {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CallOutcome::Completed { .. })
    }

    pub fn trades(&self) -> &[Trade] {
        match &self.outcome {
            CallOutcome::Completed { backtest, .. } => &backtest.trades,
            CallOutcome::Skipped { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Same order as the input calls.
    pub results: Vec<CallResult>,
    pub completed: usize,
    pub skipped: usize,
    pub summary: TradeSummary,
}

impl BatchReport {
    /// One JSON object per call, in input order.
    pub fn write_jsonl<W: std::io::Write>(&self, mut writer: W) -> serde_json::Result<()> {
        for result in &self.results {
            serde_json::to_writer(&mut writer, result)?;
            writer.write_all(b"\n").map_err(serde_json::Error::io)?;
        }
        Ok(())
    }
}

pub fn run_batch(calls: &[CallSpec], config: &SimulationConfig) -> Result<BatchReport, BatchError> {
    let plan = config.validate()?;
    let hierarchy = RngHierarchy::new(config.batch.master_seed);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.batch.max_threads)
        .build()?;

    info!(
        calls = calls.len(),
        threads = pool.current_num_threads(),
        master_seed = config.batch.master_seed,
        "batch started"
    );

    let results: Vec<CallResult> = pool.install(|| {
        calls
            .par_iter()
            .map(|spec| run_call(spec, config, &plan, &hierarchy))
            .collect::<Result<_, _>>()
    })?;

    let completed = results.iter().filter(|r| r.is_completed()).count();
    let skipped = results.len() - completed;
    let trades: Vec<Trade> = results
        .iter()
        .flat_map(|r| r.trades().iter().cloned())
        .collect();
    let summary = summarize(&trades);

    info!(
        calls = results.len(),
        completed,
        skipped,
        trades = summary.trades,
        "batch finished"
    );

    Ok(BatchReport {
        results,
        completed,
        skipped,
        summary,
    })
}

/// Quality metrics → gate → backtest for a single call.
pub fn run_call(
    spec: &CallSpec,
    config: &SimulationConfig,
    plan: &ValidatedPlan,
    hierarchy: &RngHierarchy,
) -> Result<CallResult, BatchError> {
    let call_id = spec.call.call_id.clone();
    let seed = hierarchy.sub_seed(EXECUTION_SCOPE, &call_id, 0);
    let skip = |reason: String, quality: Option<QualityMetrics>| {
        Ok::<_, BatchError>(skipped(&call_id, seed, reason, quality))
    };

    let window = spec
        .window
        .or_else(|| QualityWindow::covering(&spec.candles, config.batch.interval_secs));
    let Some(window) = window else {
        return skip("no candles".to_string(), None);
    };

    let quality = calculate_quality_metrics(&spec.candles, &window);
    let gate = match enforce_all_quality_gates(&quality, &config.quality) {
        Ok(report) => report,
        Err(source) if config.batch.abort_on_gate_failure => {
            return Err(BatchError::QualityGate {
                call_id: call_id.clone(),
                source,
            });
        }
        Err(err) => return skip(err.to_string(), Some(quality)),
    };

    let inputs = BacktestInputs {
        call: &spec.call,
        candles: &spec.candles,
        entry_ts_ms: spec.entry_ts_ms,
        entry_px: spec.entry_px,
        plan,
        reentry: config.reentry,
        execution: &config.execution,
        position_size_usd: config.batch.position_size_usd,
        liquidity_usd: spec.liquidity_usd,
        venue: &config.batch.venue,
        seed,
    };
    match backtest_exit_stack(&inputs) {
        Ok(backtest) => Ok(CallResult {
            call_id: call_id.clone(),
            seed,
            outcome: CallOutcome::Completed {
                quality,
                gate,
                backtest,
            },
        }),
        Err(err) => skip(err.to_string(), Some(quality)),
    }
}

fn skipped(
    call_id: &str,
    seed: u64,
    reason: String,
    quality: Option<QualityMetrics>,
) -> CallResult {
    warn!(call_id = %call_id, reason = %reason, "call skipped");
    CallResult {
        call_id: call_id.to_string(),
        seed,
        outcome: CallOutcome::Skipped { reason, quality },
    }
}
