//! Monte Carlo sampling over parameter perturbations

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::random::RandomSource;
use super::{check_cancelled, CancelFlag, ScenarioRunner};
use crate::error::{ModelError, Result};
use crate::params::{ParameterKey, Parameters};
use crate::projection::Summary;

/// Uniform multiplier range applied to one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub key: ParameterKey,
    pub low: f64,
    pub high: f64,
}

impl Perturbation {
    pub fn new(key: ParameterKey, low: f64, high: f64) -> Self {
        Self { key, low, high }
    }

    /// Multiplier for a uniform draw `u` in `[0, 1)`
    fn multiplier(&self, u: f64) -> f64 {
        self.low + u * (self.high - self.low)
    }

    fn validate(&self) -> Result<()> {
        let finite = self.low.is_finite() && self.high.is_finite();
        if !finite || self.low <= 0.0 || self.low > self.high {
            return Err(ModelError::InvalidConfig(format!(
                "perturbation range for {} must satisfy 0 < low <= high, got [{}, {}]",
                self.key, self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    #[serde(default = "default_perturbations")]
    pub perturbations: Vec<Perturbation>,
}

fn default_iterations() -> usize { 500 }

fn default_perturbations() -> Vec<Perturbation> {
    vec![
        Perturbation::new(ParameterKey::VirtualGrowthMult, 0.8, 1.2),
        Perturbation::new(ParameterKey::MicroGrowthMult, 0.7, 1.3),
        Perturbation::new(ParameterKey::MidSizedGrowthMult, 0.6, 1.4),
        Perturbation::new(ParameterKey::CostInflation, 0.9, 1.1),
        Perturbation::new(ParameterKey::EbitdaMultiple, 0.7, 1.3),
    ]
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            perturbations: default_perturbations(),
        }
    }
}

impl MonteCarloConfig {
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ModelError::InvalidConfig(
                "Monte Carlo needs at least one iteration".to_string(),
            ));
        }
        self.perturbations.iter().try_for_each(Perturbation::validate)
    }
}

/// Headline figures of one sampled run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutcome {
    pub terminal_value: f64,
    pub revenue: f64,
    pub ebitda: f64,
    pub students: u64,
    pub peak_funding: f64,
    /// Multiplier drawn for each perturbed parameter
    pub multipliers: Vec<(ParameterKey, f64)>,
}

impl SampleOutcome {
    fn from_summary(summary: &Summary, multipliers: Vec<(ParameterKey, f64)>) -> Self {
        Self {
            terminal_value: summary.terminal_value,
            revenue: summary.total_revenue,
            ebitda: summary.total_ebitda,
            students: summary.total_students,
            peak_funding: summary.peak_funding,
            multipliers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMeans {
    pub terminal_value: f64,
    pub revenue: f64,
    pub ebitda: f64,
    pub students: f64,
    pub peak_funding: f64,
}

/// Ranked outcomes with percentile picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloSummary {
    pub iterations: usize,
    pub p10: SampleOutcome,
    pub p25: SampleOutcome,
    pub p50: SampleOutcome,
    pub p75: SampleOutcome,
    pub p90: SampleOutcome,
    pub mean: MetricMeans,
    /// Every outcome, ascending by terminal value
    pub all: Vec<SampleOutcome>,
}

/// Index of percentile `p` in a ranked set of `n` samples
fn percentile_index(n: usize, p: f64) -> usize {
    ((n as f64 * p).floor() as usize).min(n.saturating_sub(1))
}

fn mean_of(outcomes: &[SampleOutcome]) -> MetricMeans {
    let n = outcomes.len().max(1) as f64;
    let sum = |f: fn(&SampleOutcome) -> f64| outcomes.iter().map(f).sum::<f64>() / n;
    MetricMeans {
        terminal_value: sum(|o| o.terminal_value),
        revenue: sum(|o| o.revenue),
        ebitda: sum(|o| o.ebitda),
        students: sum(|o| o.students as f64),
        peak_funding: sum(|o| o.peak_funding),
    }
}

impl ScenarioRunner {
    /// Sample perturbed parameter sets and rank the outcomes
    ///
    /// Draws are taken in order from `source` before any run starts, so a
    /// seeded source reproduces the same summary regardless of thread count.
    pub fn monte_carlo<S: RandomSource>(
        &self,
        params: &Parameters,
        config: &MonteCarloConfig,
        source: &mut S,
        cancel: Option<&CancelFlag>,
    ) -> Result<MonteCarloSummary> {
        config.validate()?;
        params.validate()?;
        info!(
            "Monte Carlo: {} iterations over {} perturbed parameters",
            config.iterations,
            config.perturbations.len()
        );

        let draws: Vec<Vec<(ParameterKey, f64)>> = (0..config.iterations)
            .map(|_| {
                config
                    .perturbations
                    .iter()
                    .map(|p| (p.key, p.multiplier(source.next_uniform())))
                    .collect()
            })
            .collect();

        let mut all = draws
            .into_par_iter()
            .map(|multipliers| {
                check_cancelled(cancel)?;
                let mut sample = params.clone();
                for &(key, multiplier) in &multipliers {
                    sample.set(key, params.get(key) * multiplier);
                }
                let result = self.project(&sample)?;
                Ok(SampleOutcome::from_summary(&result.summary, multipliers))
            })
            .collect::<Result<Vec<_>>>()?;

        all.sort_by(|a, b| a.terminal_value.total_cmp(&b.terminal_value));

        let n = all.len();
        let pick = |p: f64| all[percentile_index(n, p)].clone();
        let summary = MonteCarloSummary {
            iterations: n,
            p10: pick(0.10),
            p25: pick(0.25),
            p50: pick(0.50),
            p75: pick(0.75),
            p90: pick(0.90),
            mean: mean_of(&all),
            all,
        };

        info!(
            "Monte Carlo complete: P10={:.0}, P50={:.0}, P90={:.0}",
            summary.p10.terminal_value, summary.p50.terminal_value, summary.p90.terminal_value
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionEngine;
    use crate::scenario::{run_monte_carlo, SeededSource};
    use crate::trajectory::Trajectories;
    use approx::assert_relative_eq;

    struct ConstantSource {
        value: f64,
        draws: usize,
    }

    impl RandomSource for ConstantSource {
        fn next_uniform(&mut self) -> f64 {
            self.draws += 1;
            self.value
        }
    }

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(ProjectionEngine::default(), Trajectories::default())
    }

    #[test]
    fn test_percentile_index() {
        assert_eq!(percentile_index(500, 0.10), 50);
        assert_eq!(percentile_index(500, 0.90), 450);
        assert_eq!(percentile_index(1, 0.90), 0);
        assert_eq!(percentile_index(3, 0.50), 1);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let config = MonteCarloConfig::with_iterations(40);
        let params = Parameters::default();
        let trajectories = Trajectories::default();

        let run = |seed| {
            let mut source = SeededSource::from_seed(seed);
            run_monte_carlo(&params, &trajectories, &config, &mut source, None).unwrap()
        };
        let a = run(11);
        let b = run(11);
        assert_eq!(a, b);
    }

    #[test]
    fn test_outcomes_ranked_and_percentiles_ordered() {
        let summary = runner()
            .monte_carlo(
                &Parameters::default(),
                &MonteCarloConfig::with_iterations(60),
                &mut SeededSource::from_seed(3),
                None,
            )
            .unwrap();

        assert_eq!(summary.iterations, 60);
        assert_eq!(summary.all.len(), 60);
        assert!(summary
            .all
            .windows(2)
            .all(|w| w[0].terminal_value <= w[1].terminal_value));
        assert!(summary.p10.terminal_value <= summary.p25.terminal_value);
        assert!(summary.p25.terminal_value <= summary.p50.terminal_value);
        assert!(summary.p50.terminal_value <= summary.p75.terminal_value);
        assert!(summary.p75.terminal_value <= summary.p90.terminal_value);
        assert_eq!(summary.p50, summary.all[30]);

        for outcome in &summary.all {
            assert_eq!(outcome.multipliers.len(), 5);
            for (key, multiplier) in &outcome.multipliers {
                let range = default_perturbations()
                    .into_iter()
                    .find(|p| p.key == *key)
                    .unwrap();
                assert!(*multiplier >= range.low && *multiplier <= range.high);
            }
        }
    }

    #[test]
    fn test_midpoint_draws_reproduce_base_case() {
        let runner = runner();
        let params = Parameters::default();
        let base = runner.project(&params).unwrap().summary;
        let mut source = ConstantSource { value: 0.5, draws: 0 };

        let summary = runner
            .monte_carlo(&params, &MonteCarloConfig::with_iterations(4), &mut source, None)
            .unwrap();

        assert_eq!(source.draws, 4 * 5);
        assert_relative_eq!(summary.mean.terminal_value, base.terminal_value, max_relative = 1e-9);
        assert_relative_eq!(summary.p90.revenue, base.total_revenue, max_relative = 1e-9);
    }

    #[test]
    fn test_cancelled_before_start() {
        let flag = CancelFlag::new();
        flag.cancel();
        let err = runner()
            .monte_carlo(
                &Parameters::default(),
                &MonteCarloConfig::with_iterations(10),
                &mut SeededSource::from_seed(1),
                Some(&flag),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::Cancelled));
    }

    #[test]
    fn test_invalid_config() {
        let mut source = SeededSource::from_seed(1);
        let params = Parameters::default();

        let err = runner()
            .monte_carlo(&params, &MonteCarloConfig::with_iterations(0), &mut source, None)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));

        let config = MonteCarloConfig {
            iterations: 10,
            perturbations: vec![Perturbation::new(ParameterKey::CostInflation, 1.2, 0.8)],
        };
        let err = runner().monte_carlo(&params, &config, &mut source, None).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
