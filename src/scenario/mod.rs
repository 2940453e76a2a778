//! Scenario analysis on top of the projection engine
//!
//! - Monte Carlo: perturb parameters within ranges, rank outcomes by terminal value
//! - Sensitivity: sweep one parameter across a multiplier range
//! - Goal seek: bisect one parameter to hit a target metric
//!
//! Every engine run is independent, so the sampler and the sweep fan out
//! over `rayon` and merge afterwards.

mod monte_carlo;
mod sensitivity;
mod goal_seek;
mod random;

pub use monte_carlo::{
    MetricMeans, MonteCarloConfig, MonteCarloSummary, Perturbation, SampleOutcome,
};
pub use sensitivity::{SensitivityPoint, DEFAULT_SENSITIVITY_STEPS};
pub use goal_seek::{GoalSeekConfig, GoalSeekResult, GoalSeekSample, GoalSeekStatus};
pub use random::{RandomSource, SeededSource};

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::params::{ParameterKey, Parameters};
use crate::projection::{ModelResult, ProjectionEngine, Summary};
use crate::trajectory::Trajectories;

/// Scalar outcome read from a projection summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    TerminalValue,
    Revenue,
    Ebitda,
    Students,
    PeakFunding,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::TerminalValue,
        Metric::Revenue,
        Metric::Ebitda,
        Metric::Students,
        Metric::PeakFunding,
    ];

    /// Final-period value of this metric
    pub fn value(self, summary: &Summary) -> f64 {
        match self {
            Metric::TerminalValue => summary.terminal_value,
            Metric::Revenue => summary.total_revenue,
            Metric::Ebitda => summary.total_ebitda,
            Metric::Students => summary.total_students as f64,
            Metric::PeakFunding => summary.peak_funding,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::TerminalValue => "terminalValue",
            Metric::Revenue => "revenue",
            Metric::Ebitda => "ebitda",
            Metric::Students => "students",
            Metric::PeakFunding => "peakFunding",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        let normalized = normalized.to_ascii_lowercase();
        let stripped = normalized.strip_prefix("total").unwrap_or(&normalized);
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(stripped))
            .ok_or_else(|| ModelError::UnknownMetric(s.to_string()))
    }
}

/// Cooperative cancellation shared with a running sampler or sweep
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn check_cancelled(cancel: Option<&CancelFlag>) -> Result<()> {
    match cancel {
        Some(flag) if flag.is_cancelled() => Err(ModelError::Cancelled),
        _ => Ok(()),
    }
}

/// Engine plus trajectories, shared by every analysis
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    engine: ProjectionEngine,
    trajectories: Trajectories,
}

impl ScenarioRunner {
    pub fn new(engine: ProjectionEngine, trajectories: Trajectories) -> Self {
        Self {
            engine,
            trajectories,
        }
    }

    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }

    pub fn trajectories(&self) -> &Trajectories {
        &self.trajectories
    }

    pub fn project(&self, params: &Parameters) -> Result<ModelResult> {
        self.engine.project(params, &self.trajectories)
    }

    /// Project with one parameter scaled by `multiplier`
    fn project_scaled(
        &self,
        params: &Parameters,
        key: ParameterKey,
        multiplier: f64,
    ) -> Result<ModelResult> {
        self.project(&params.scaled(key, multiplier))
    }
}

/// Monte Carlo over the baked-in assumption book
pub fn run_monte_carlo<S: RandomSource>(
    params: &Parameters,
    trajectories: &Trajectories,
    config: &MonteCarloConfig,
    source: &mut S,
    cancel: Option<&CancelFlag>,
) -> Result<MonteCarloSummary> {
    ScenarioRunner::new(ProjectionEngine::default(), trajectories.clone())
        .monte_carlo(params, config, source, cancel)
}

/// Sensitivity sweep over the baked-in assumption book
pub fn run_sensitivity(
    params: &Parameters,
    trajectories: &Trajectories,
    key: ParameterKey,
    range: (f64, f64),
    steps: usize,
) -> Result<Vec<SensitivityPoint>> {
    ScenarioRunner::new(ProjectionEngine::default(), trajectories.clone())
        .sensitivity(params, key, range, steps, None)
}

/// Goal seek over the baked-in assumption book
pub fn goal_seek(
    params: &Parameters,
    trajectories: &Trajectories,
    config: &GoalSeekConfig,
) -> Result<GoalSeekResult> {
    ScenarioRunner::new(ProjectionEngine::default(), trajectories.clone()).goal_seek(params, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_names() {
        assert_eq!("terminalValue".parse::<Metric>().unwrap(), Metric::TerminalValue);
        assert_eq!("totalRevenue".parse::<Metric>().unwrap(), Metric::Revenue);
        assert_eq!("EBITDA".parse::<Metric>().unwrap(), Metric::Ebitda);
        assert_eq!("total_students".parse::<Metric>().unwrap(), Metric::Students);
        assert!(matches!("irr".parse::<Metric>(), Err(ModelError::UnknownMetric(_))));
    }

    #[test]
    fn test_metric_reads_summary() {
        let result =
            crate::projection::project(&Parameters::default(), &Trajectories::default()).unwrap();
        assert_eq!(Metric::Revenue.value(&result.summary), result.summary.total_revenue);
        assert_eq!(
            Metric::Students.value(&result.summary),
            result.final_year().total_students as f64
        );
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(check_cancelled(Some(&flag)).is_ok());
        flag.cancel();
        assert!(matches!(check_cancelled(Some(&flag)), Err(ModelError::Cancelled)));
        assert!(check_cancelled(None).is_ok());
    }
}
