//! Bisection goal seek on one parameter
//!
//! The search variable is a multiplier on the base value of the chosen
//! parameter. Bisection assumes the metric is non-decreasing in that
//! multiplier; every evaluation is checked against the ones before it and a
//! violation is reported as [`GoalSeekStatus::NonMonotonic`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{Metric, ScenarioRunner};
use crate::error::{ModelError, Result};
use crate::params::{ParameterKey, Parameters};

/// Solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSeekConfig {
    pub metric: Metric,
    pub target: f64,
    pub parameter: ParameterKey,

    /// Stop once the bracket is narrower than this
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Multiplier bracket searched
    #[serde(default = "default_bounds")]
    pub bounds: (f64, f64),
}

fn default_tolerance() -> f64 { 0.01 }
fn default_max_iterations() -> usize { 50 }
fn default_bounds() -> (f64, f64) { (0.1, 3.0) }

impl GoalSeekConfig {
    pub fn new(metric: Metric, target: f64, parameter: ParameterKey) -> Self {
        Self {
            metric,
            target,
            parameter,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            bounds: default_bounds(),
        }
    }

    /// Resolve metric and parameter names, failing before any run
    pub fn from_names(metric: &str, target: f64, parameter: &str) -> Result<Self> {
        Ok(Self::new(metric.parse()?, target, parameter.parse()?))
    }

    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.bounds;
        if !self.target.is_finite() {
            return Err(ModelError::InvalidConfig(format!(
                "goal seek target must be finite, got {}",
                self.target
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "goal seek tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(low.is_finite() && high.is_finite()) || low <= 0.0 || low >= high {
            return Err(ModelError::InvalidConfig(format!(
                "goal seek bounds must satisfy 0 < low < high, got ({low}, {high})"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalSeekStatus {
    /// Bracket narrowed below tolerance
    Converged,
    /// Iteration cap hit first; the result is the best estimate so far
    MaxIterationsReached,
    /// Metric fell as the multiplier rose; the result is unreliable
    NonMonotonic,
    /// Target lies outside the metric range on the bounds; pinned to the nearer bound
    TargetOutOfRange,
}

/// One evaluation made by the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSeekSample {
    pub multiplier: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSeekResult {
    pub multiplier: f64,
    /// Parameter value the multiplier resolves to
    pub parameter_value: f64,
    /// Metric value at the returned multiplier
    pub achieved: f64,
    pub status: GoalSeekStatus,
    /// Bisection steps taken, excluding the endpoint evaluations
    pub iterations: usize,
    pub history: Vec<GoalSeekSample>,
}

impl GoalSeekResult {
    pub fn converged(&self) -> bool {
        self.status == GoalSeekStatus::Converged
    }
}

/// Does `value` at `multiplier` contradict a non-decreasing metric?
fn breaks_order(history: &[GoalSeekSample], multiplier: f64, value: f64) -> bool {
    history.iter().any(|s| {
        let slack = 1e-9 * s.value.abs().max(value.abs()).max(1.0);
        (s.multiplier < multiplier && s.value > value + slack)
            || (s.multiplier > multiplier && s.value < value - slack)
    })
}

impl ScenarioRunner {
    /// Find the multiplier on `config.parameter` at which `config.metric` reaches `config.target`
    pub fn goal_seek(
        &self,
        params: &Parameters,
        config: &GoalSeekConfig,
    ) -> Result<GoalSeekResult> {
        config.validate()?;
        params.validate()?;
        info!(
            "Goal seek: {} = {} by varying {} in {:?}",
            config.metric, config.target, config.parameter, config.bounds
        );

        let evaluate = |multiplier: f64| -> Result<f64> {
            let result = self.project_scaled(params, config.parameter, multiplier)?;
            Ok(config.metric.value(&result.summary))
        };

        let (mut low, mut high) = config.bounds;
        let at_low = evaluate(low)?;
        let at_high = evaluate(high)?;
        let mut history = vec![
            GoalSeekSample { multiplier: low, value: at_low },
            GoalSeekSample { multiplier: high, value: at_high },
        ];

        let mut non_monotonic = at_low > at_high;
        let out_of_range =
            config.target < at_low.min(at_high) || config.target > at_low.max(at_high);

        let mut iterations = 0;
        while iterations < config.max_iterations && high - low >= config.tolerance {
            iterations += 1;
            let mid = (low + high) / 2.0;
            let value = evaluate(mid)?;
            debug!(
                "Goal seek iteration {iterations}: multiplier={mid:.6}, {}={value:.2}",
                config.metric
            );

            non_monotonic |= breaks_order(&history, mid, value);
            history.push(GoalSeekSample { multiplier: mid, value });

            if value < config.target {
                low = mid;
            } else {
                high = mid;
            }
        }

        let multiplier = (low + high) / 2.0;
        let achieved = evaluate(multiplier)?;

        let status = if non_monotonic {
            GoalSeekStatus::NonMonotonic
        } else if out_of_range {
            GoalSeekStatus::TargetOutOfRange
        } else if high - low < config.tolerance {
            GoalSeekStatus::Converged
        } else {
            GoalSeekStatus::MaxIterationsReached
        };

        match status {
            GoalSeekStatus::Converged => info!(
                "Goal seek converged after {iterations} iterations: \
                 multiplier={multiplier:.4}, {}={achieved:.2}",
                config.metric
            ),
            other => warn!(
                "Goal seek ended {other:?} after {iterations} iterations: \
                 multiplier={multiplier:.4}, {}={achieved:.2}",
                config.metric
            ),
        }

        Ok(GoalSeekResult {
            multiplier,
            parameter_value: params.get(config.parameter) * multiplier,
            achieved,
            status,
            iterations,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionEngine;
    use crate::scenario::goal_seek;
    use crate::trajectory::Trajectories;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(ProjectionEngine::default(), Trajectories::default())
    }

    #[test]
    fn test_recovers_revenue_target() {
        let runner = runner();
        let params = Parameters::default();
        let target = runner
            .project(&params.scaled(ParameterKey::MidSizedGrowthMult, 1.5))
            .unwrap()
            .summary
            .total_revenue;

        let config = GoalSeekConfig::new(Metric::Revenue, target, ParameterKey::MidSizedGrowthMult);
        let result = runner.goal_seek(&params, &config).unwrap();

        assert_eq!(result.status, GoalSeekStatus::Converged);
        assert!(result.converged());
        assert!((result.multiplier - 1.5).abs() < 0.1);
        assert!((result.achieved - target).abs() / target < 0.01);
        assert_eq!(result.parameter_value, result.multiplier);
        assert_eq!(result.history.len(), result.iterations + 2);
        assert!(result.iterations <= config.max_iterations);
    }

    #[test]
    fn test_scales_non_unit_base() {
        let params = Parameters::default();
        let target = runner()
            .project(&params.scaled(ParameterKey::EbitdaMultiple, 1.2))
            .unwrap()
            .summary
            .terminal_value;

        let config =
            GoalSeekConfig::new(Metric::TerminalValue, target, ParameterKey::EbitdaMultiple);
        let result = goal_seek(&params, &Trajectories::default(), &config).unwrap();

        assert_eq!(result.status, GoalSeekStatus::Converged);
        assert!((result.multiplier - 1.2).abs() < 0.01);
        assert_eq!(result.parameter_value, 17.5 * result.multiplier);
    }

    #[test]
    fn test_decreasing_metric_is_flagged() {
        let runner = runner();
        let params = Parameters::default();
        let target = runner.project(&params).unwrap().summary.terminal_value;

        let config =
            GoalSeekConfig::new(Metric::TerminalValue, target, ParameterKey::CostInflation);
        let result = runner.goal_seek(&params, &config).unwrap();
        assert_eq!(result.status, GoalSeekStatus::NonMonotonic);
    }

    #[test]
    fn test_unreachable_target_pins_to_bound() {
        let runner = runner();
        let params = Parameters::default();
        let ceiling = runner
            .project(&params.scaled(ParameterKey::MidSizedGrowthMult, 3.0))
            .unwrap()
            .summary
            .total_revenue;

        let config = GoalSeekConfig::new(
            Metric::Revenue,
            ceiling * 10.0,
            ParameterKey::MidSizedGrowthMult,
        );
        let result = runner.goal_seek(&params, &config).unwrap();

        assert_eq!(result.status, GoalSeekStatus::TargetOutOfRange);
        assert!(result.multiplier > 3.0 - config.tolerance);
    }

    #[test]
    fn test_iteration_cap() {
        let runner = runner();
        let params = Parameters::default();
        let target = runner
            .project(&params.scaled(ParameterKey::MidSizedGrowthMult, 1.5))
            .unwrap()
            .summary
            .total_revenue;

        let config = GoalSeekConfig {
            max_iterations: 3,
            ..GoalSeekConfig::new(Metric::Revenue, target, ParameterKey::MidSizedGrowthMult)
        };
        let result = runner.goal_seek(&params, &config).unwrap();

        assert_eq!(result.status, GoalSeekStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 3);
        assert!(result.multiplier > 0.1 && result.multiplier < 3.0);
    }

    #[test]
    fn test_unknown_names_fail_fast() {
        assert!(matches!(
            GoalSeekConfig::from_names("irr", 1.0, "ebitdaMultiple"),
            Err(ModelError::UnknownMetric(_))
        ));
        assert!(matches!(
            GoalSeekConfig::from_names("revenue", 1.0, "discountRate"),
            Err(ModelError::UnknownParameter(_))
        ));
        let config = GoalSeekConfig::from_names("terminal_value", 1.0, "ebitda_multiple").unwrap();
        assert_eq!(config.metric, Metric::TerminalValue);
        assert_eq!(config.parameter, ParameterKey::EbitdaMultiple);
    }

    #[test]
    fn test_invalid_bounds() {
        let config = GoalSeekConfig {
            bounds: (2.0, 1.0),
            ..GoalSeekConfig::new(Metric::Revenue, 1.0, ParameterKey::MicroGrowthMult)
        };
        let err = runner().goal_seek(&Parameters::default(), &config).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
