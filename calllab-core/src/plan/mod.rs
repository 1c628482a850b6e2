//! Declarative exit plan.
//!
//! An [`ExitPlan`] is plain serializable configuration. It is validated exactly
//! once through [`ExitPlan::validate`], which yields a [`ValidatedPlan`]; the
//! evaluator only accepts the validated form, so hot-path code never re-checks
//! or re-defaults fields.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use thiserror::Error;

pub use rules::{IndicatorExitConfig, IndicatorRule, RuleMode};

/// Errors raised while validating an exit plan or re-entry config.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("ladder leg {index}: target {target} must be a positive finite multiple of entry")]
    LadderTarget { index: usize, target: f64 },
    #[error("ladder leg {index}: fraction {fraction} must be in (0, 1]")]
    LadderFraction { index: usize, fraction: f64 },
    #[error("ladder targets must be strictly ascending (leg {index})")]
    LadderOrder { index: usize },
    #[error("ladder fractions sum to {sum}, which exceeds the position")]
    LadderOverfilled { sum: f64 },
    #[error("trail_bps {0} must be in (0, 10000)")]
    TrailBps(f64),
    #[error("hard_stop_bps {0} must be in (0, 10000)")]
    HardStopBps(f64),
    #[error("trailing activation multiple {0} must be positive and finite")]
    ActivationMultiple(f64),
    #[error("max_hold_secs {0} must be positive")]
    MaxHold(i64),
    #[error("min_hold_secs {0} must not be negative")]
    MinHold(i64),
    #[error("indicator exit has no rules")]
    NoRules,
    #[error("indicator rule {index}: {reason}")]
    Rule { index: usize, reason: String },
    #[error("re-entry retrace fraction {0} must be in (0, 1)")]
    RetraceFraction(f64),
    #[error("re-entry size fraction {0} must be in (0, 1]")]
    SizeFraction(f64),
}

/// One partial take-profit leg: close `fraction` of the original size once
/// the price reaches `target` × entry price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderLeg {
    pub target: f64,
    pub fraction: f64,
}

/// Which trigger is assumed to happen first when a ladder target and a stop
/// are both reachable inside one candle. Never inferred from the candle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntrabarPolicy {
    /// Conservative: the stop resolves first and takes the whole residual.
    #[default]
    StopFirst,
    /// Optimistic: reachable targets fill first, then the stop closes what is left.
    TargetsFirst,
}

/// When the trailing stop starts ratcheting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrailingActivation {
    Immediate,
    /// Once a candle high reaches `multiple` × entry price.
    AtMultiple { multiple: f64 },
    /// Once the first ladder leg has filled.
    AfterFirstTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopConfig {
    /// Governs the ratcheting part only; the hard stop applies whenever set.
    pub enabled: bool,
    pub trail_bps: f64,
    pub activation: TrailingActivation,
    #[serde(default)]
    pub hard_stop_bps: Option<f64>,
    #[serde(default)]
    pub intrabar_policy: IntrabarPolicy,
}

impl TrailingStopConfig {
    pub fn hard_stop_price(&self, entry_px: f64) -> Option<f64> {
        self.hard_stop_bps
            .map(|bps| entry_px * (1.0 - bps / 10_000.0))
    }

    pub fn trailing_price(&self, high_water_mark: f64) -> f64 {
        high_water_mark * (1.0 - self.trail_bps / 10_000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeExitConfig {
    pub max_hold_secs: i64,
}

impl TimeExitConfig {
    pub fn max_hold_ms(&self) -> i64 {
        self.max_hold_secs.saturating_mul(1000)
    }
}

/// Exit plan: ladder, trailing/hard stop, indicator exit, time exit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPlan {
    pub ladder: Vec<LadderLeg>,
    pub trailing: Option<TrailingStopConfig>,
    pub indicator_exit: Option<IndicatorExitConfig>,
    pub time_exit: Option<TimeExitConfig>,
    /// Indicator and time exits are suppressed until this much time has passed.
    pub min_hold_secs: i64,
}

impl ExitPlan {
    /// Validate once and freeze the plan.
    pub fn validate(self) -> Result<ValidatedPlan, PlanError> {
        let mut sum = 0.0;
        for (index, leg) in self.ladder.iter().enumerate() {
            if !(leg.target.is_finite() && leg.target > 0.0) {
                return Err(PlanError::LadderTarget {
                    index,
                    target: leg.target,
                });
            }
            if !(leg.fraction > 0.0 && leg.fraction <= 1.0) {
                return Err(PlanError::LadderFraction {
                    index,
                    fraction: leg.fraction,
                });
            }
            if index > 0 && leg.target <= self.ladder[index - 1].target {
                return Err(PlanError::LadderOrder { index });
            }
            sum += leg.fraction;
        }
        if sum > 1.0 + 1e-9 {
            return Err(PlanError::LadderOverfilled { sum });
        }

        if let Some(trailing) = &self.trailing {
            if trailing.enabled && !(trailing.trail_bps > 0.0 && trailing.trail_bps < 10_000.0) {
                return Err(PlanError::TrailBps(trailing.trail_bps));
            }
            if let Some(bps) = trailing.hard_stop_bps {
                if !(bps > 0.0 && bps < 10_000.0) {
                    return Err(PlanError::HardStopBps(bps));
                }
            }
            if let TrailingActivation::AtMultiple { multiple } = trailing.activation {
                if !(multiple.is_finite() && multiple > 0.0) {
                    return Err(PlanError::ActivationMultiple(multiple));
                }
            }
        }

        if let Some(time) = &self.time_exit {
            if time.max_hold_secs <= 0 {
                return Err(PlanError::MaxHold(time.max_hold_secs));
            }
        }
        if self.min_hold_secs < 0 {
            return Err(PlanError::MinHold(self.min_hold_secs));
        }

        if let Some(indicator_exit) = &self.indicator_exit {
            indicator_exit.validate()?;
        }

        Ok(ValidatedPlan(self))
    }
}

/// An exit plan that passed validation. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPlan(ExitPlan);

impl ValidatedPlan {
    pub fn plan(&self) -> &ExitPlan {
        &self.0
    }

    pub fn into_inner(self) -> ExitPlan {
        self.0
    }

    pub fn hard_stop_price(&self, entry_px: f64) -> Option<f64> {
        self.0
            .trailing
            .as_ref()
            .and_then(|t| t.hard_stop_price(entry_px))
    }

    pub fn intrabar_policy(&self) -> IntrabarPolicy {
        self.0
            .trailing
            .map(|t| t.intrabar_policy)
            .unwrap_or_default()
    }

    pub fn min_hold_ms(&self) -> i64 {
        self.0.min_hold_secs.saturating_mul(1000)
    }

    pub fn max_hold_ms(&self) -> Option<i64> {
        self.0.time_exit.map(|t| t.max_hold_ms())
    }
}

impl Deref for ValidatedPlan {
    type Target = ExitPlan;

    fn deref(&self) -> &ExitPlan {
        &self.0
    }
}
