//! One-parameter sensitivity sweep

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{check_cancelled, CancelFlag, ScenarioRunner};
use crate::error::{ModelError, Result};
use crate::params::{ParameterKey, Parameters};

pub const DEFAULT_SENSITIVITY_STEPS: usize = 21;

/// Outcome of the projection at one point of the sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityPoint {
    pub multiplier: f64,
    pub parameter_value: f64,
    pub terminal_value: f64,
    pub ebitda: f64,
    pub revenue: f64,
}

/// Evenly spaced multipliers from `low` to exactly `high`
fn multipliers(low: f64, high: f64, steps: usize) -> Vec<f64> {
    let last = steps - 1;
    (0..steps)
        .map(|i| {
            if i == last {
                high
            } else {
                low + (high - low) * i as f64 / last as f64
            }
        })
        .collect()
}

impl ScenarioRunner {
    /// Sweep `key` over `base × [low, high]` in `steps` points, other parameters fixed
    pub fn sensitivity(
        &self,
        params: &Parameters,
        key: ParameterKey,
        (low, high): (f64, f64),
        steps: usize,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<SensitivityPoint>> {
        if steps < 2 {
            return Err(ModelError::InvalidConfig(format!(
                "sensitivity sweep needs at least 2 steps, got {steps}"
            )));
        }
        if !(low.is_finite() && high.is_finite()) || low <= 0.0 || low > high {
            return Err(ModelError::InvalidConfig(format!(
                "sensitivity range must satisfy 0 < low <= high, got [{low}, {high}]"
            )));
        }
        params.validate()?;
        info!("Sensitivity: {key} over [{low}, {high}] in {steps} steps");

        let base = params.get(key);
        let points = multipliers(low, high, steps)
            .into_par_iter()
            .map(|multiplier| {
                check_cancelled(cancel)?;
                let summary = self.project_scaled(params, key, multiplier)?.summary;
                Ok(SensitivityPoint {
                    multiplier,
                    parameter_value: base * multiplier,
                    terminal_value: summary.terminal_value,
                    ebitda: summary.total_ebitda,
                    revenue: summary.total_revenue,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Sensitivity complete: {} points", points.len());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionEngine;
    use crate::scenario::run_sensitivity;
    use crate::trajectory::Trajectories;
    use approx::assert_relative_eq;

    #[test]
    fn test_multiplier_grid() {
        let grid = multipliers(0.5, 1.5, 21);
        assert_eq!(grid.len(), 21);
        assert_eq!(grid[0], 0.5);
        assert_eq!(grid[20], 1.5);
        assert_relative_eq!(grid[10], 1.0, epsilon = 1e-12);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ebitda_multiple_sweep() {
        let params = Parameters::default();
        let points = run_sensitivity(
            &params,
            &Trajectories::default(),
            ParameterKey::EbitdaMultiple,
            (0.5, 1.5),
            DEFAULT_SENSITIVITY_STEPS,
        )
        .unwrap();

        assert_eq!(points.len(), 21);
        assert_eq!(points[0].multiplier, 0.5);
        assert_eq!(points[20].multiplier, 1.5);
        assert_eq!(points[0].parameter_value, 17.5 * 0.5);

        // Only the valuation moves; the operating ledger is untouched
        assert!(points.windows(2).all(|w| w[0].terminal_value < w[1].terminal_value));
        assert!(points.iter().all(|p| p.revenue == points[0].revenue));
        assert!(points.iter().all(|p| p.ebitda == points[0].ebitda));
    }

    #[test]
    fn test_cost_inflation_lowers_ebitda() {
        let points = run_sensitivity(
            &Parameters::default(),
            &Trajectories::default(),
            ParameterKey::CostInflation,
            (0.8, 1.2),
            5,
        )
        .unwrap();
        assert!(points.windows(2).all(|w| w[0].ebitda > w[1].ebitda));
    }

    #[test]
    fn test_invalid_sweeps() {
        let params = Parameters::default();
        let trajectories = Trajectories::default();
        for (range, steps) in [((0.5, 1.5), 1), ((1.5, 0.5), 21), ((0.0, 1.5), 21)] {
            let err =
                run_sensitivity(&params, &trajectories, ParameterKey::CostInflation, range, steps)
                    .unwrap_err();
            assert!(matches!(err, ModelError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_cancelled_sweep_stops() {
        let runner = ScenarioRunner::new(ProjectionEngine::default(), Trajectories::default());
        let flag = CancelFlag::new();
        flag.cancel();

        let params = Parameters::default();
        let err = runner
            .sensitivity(&params, ParameterKey::CostInflation, (0.5, 1.5), 5, Some(&flag))
            .unwrap_err();
        assert!(matches!(err, ModelError::Cancelled));
    }
}
