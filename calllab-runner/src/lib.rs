//! CallLab Runner: batch orchestration over the simulation core.
//!
//! This crate builds on `calllab-core` to provide:
//! - TOML configuration loading and validation
//! - Per-call quality gate and backtest, in a bounded rayon pool
//! - Deterministic per-call seeds from a master seed
//! - Tracing subscriber setup

pub mod batch;
pub mod config;
pub mod telemetry;

pub use batch::{run_batch, run_call, BatchError, BatchReport, CallOutcome, CallResult, CallSpec};
pub use config::{BatchSettings, ConfigError, LoggingConfig, SimulationConfig};
pub use telemetry::init_tracing;
