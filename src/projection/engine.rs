//! Projection engine: drives every segment through the horizon

use log::debug;

use super::cashflows::{
    finalize_cumulative, funding_profile, ratio, ModelResult, Summary, YearResult,
};
use super::state::SegmentState;
use super::tier::TierModel;
use super::HORIZON;
use crate::assumptions::{AssumptionBook, CapacityModel, Segment};
use crate::error::Result;
use crate::params::Parameters;
use crate::trajectory::Trajectories;

/// Runs the tier model for all segments and values the result
///
/// The engine only holds the assumption book; all run state lives inside
/// [`ProjectionEngine::project`], so one engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ProjectionEngine {
    assumptions: AssumptionBook,
}

impl ProjectionEngine {
    /// Create an engine over a validated assumption book
    pub fn new(assumptions: AssumptionBook) -> Result<Self> {
        assumptions.validate()?;
        Ok(Self { assumptions })
    }

    pub fn assumptions(&self) -> &AssumptionBook {
        &self.assumptions
    }

    /// Project all segments over the horizon
    pub fn project(&self, params: &Parameters, trajectories: &Trajectories) -> Result<ModelResult> {
        params.validate()?;
        trajectories.validate()?;

        let models = Segment::ALL.map(|s| TierModel::new(s, self.assumptions.get(s)));
        let mut states = Segment::ALL.map(|s| SegmentState::opening(self.assumptions.get(s)));

        let mut years = Vec::with_capacity(HORIZON);
        for period in 0..HORIZON {
            let segments = models
                .iter()
                .zip(states.iter_mut())
                .map(|(model, state)| {
                    let target = trajectories.get(model.segment()).target(period);
                    model.step(state, period, target, params)
                })
                .collect::<Result<Vec<_>>>()?;
            years.push(YearResult::from_segments(period, segments)?);
        }

        finalize_cumulative(&mut years);

        let property_value: f64 = Segment::ALL
            .iter()
            .zip(states.iter())
            .filter(|(s, _)| self.assumptions.get(**s).capacity_model == CapacityModel::Cohort)
            .map(|(s, state)| {
                state.units as f64 * self.assumptions.get(*s).property_value_per_unit()
            })
            .sum();

        let summary = summarize(&years, property_value, params.ebitda_multiple);
        debug!(
            "Projection complete: revenue={:.0}, ebitda={:.0}, terminal value={:.0}, \
             breakeven={:?}",
            summary.total_revenue,
            summary.total_ebitda,
            summary.terminal_value,
            summary.breakeven
        );

        Ok(ModelResult { years, summary })
    }
}

fn summarize(years: &[YearResult], property_value: f64, ebitda_multiple: f64) -> Summary {
    let (peak_funding, breakeven) = funding_profile(years);
    let (total_students, total_revenue, total_ebitda, total_timeback, cumulative_capex) =
        match years.last() {
            Some(y) => (
                y.total_students,
                y.total_revenue,
                y.total_ebitda,
                y.total_timeback,
                y.cumulative_capex,
            ),
            None => (0, 0.0, 0.0, 0.0, 0.0),
        };

    Summary {
        total_students,
        total_revenue,
        total_ebitda,
        ebitda_margin: ratio(total_ebitda, total_revenue),
        total_timeback,
        timeback_pct: ratio(total_timeback, total_revenue),
        cumulative_capex,
        property_value,
        terminal_value: total_ebitda * ebitda_multiple + property_value,
        peak_funding,
        breakeven,
    }
}

/// Project with the baked-in assumption book
pub fn project(params: &Parameters, trajectories: &Trajectories) -> Result<ModelResult> {
    ProjectionEngine::default().project(params, trajectories)
}
