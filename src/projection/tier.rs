//! Single-segment, single-period projection step
//!
//! Every count is rounded to whole students or units as soon as it is
//! produced, so each period's money figures follow from the rounded counts
//! of that period's ledger.

use log::trace;

use super::cashflows::SegmentYear;
use super::period_label;
use super::state::SegmentState;
use crate::assumptions::{AssumptionSet, CapacityModel, Segment};
use crate::error::{ModelError, Result};
use crate::params::Parameters;

/// Largest count a `u64` can hold, as the first `f64` past it
const COUNT_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Round a non-negative quantity to a whole count, or `None` if it does not fit
fn whole(value: f64) -> Option<u64> {
    let rounded = value.max(0.0).round();
    (rounded < COUNT_LIMIT).then_some(rounded as u64)
}

/// Projects one segment forward one period at a time
#[derive(Debug, Clone, Copy)]
pub struct TierModel<'a> {
    segment: Segment,
    assumptions: &'a AssumptionSet,
}

impl<'a> TierModel<'a> {
    pub fn new(segment: Segment, assumptions: &'a AssumptionSet) -> Self {
        Self {
            segment,
            assumptions,
        }
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Advance `state` through `period` toward `trajectory_target` and return the period's figures
    pub fn step(
        &self,
        state: &mut SegmentState,
        period: usize,
        trajectory_target: f64,
        params: &Parameters,
    ) -> Result<SegmentYear> {
        let a = self.assumptions;
        let too_large = |quantity: &str, value: f64| {
            ModelError::InvalidTrajectory(format!(
                "{} {quantity} of {value:e} in {} exceeds the largest representable count",
                self.segment,
                period_label(period)
            ))
        };

        // Units: targets that shrink leave the unit count frozen
        let scaled_target = trajectory_target * params.growth_multiplier(self.segment);
        let target_units = whole(scaled_target).ok_or_else(|| too_large("units", scaled_target))?;
        let existing_units = state.units;
        let new_units = target_units.saturating_sub(existing_units);
        let units = existing_units.max(target_units);

        let expected = match (a.capacity_model, state.registry.as_mut()) {
            (CapacityModel::Cohort, Some(registry)) => {
                registry.advance(new_units);
                registry.occupancy(&a.fill_rates, a.capacity_per_unit)
            }
            _ => {
                existing_units as f64 * a.capacity_per_unit
                    + new_units as f64 * a.fill_rates.first_year_rate() * a.capacity_per_unit
            }
        };
        let students = whole(expected).ok_or_else(|| too_large("students", expected))?;

        let new_students = self
            .new_students(state.students, students)
            .ok_or_else(|| too_large("new students", students as f64))?;

        let revenue = students as f64 * a.tuition;
        let recurring_cost =
            students as f64 * a.recurring_cost_per_student() * params.cost_inflation;
        let marketing = new_students as f64 * a.marketing_per_new_student();
        let facilities_cost = units as f64 * a.facilities_cost_per_unit();
        let ebitda = revenue - recurring_cost - marketing - facilities_cost;
        let capex = new_units as f64 * a.unit_capital_cost(params.flagship_capex);
        let timeback = students as f64 * a.timeback_per_student;

        trace!(
            "{} period {}: units={} (+{}), students={} (+{} recruited), ebitda={:.0}",
            self.segment, period, units, new_units, students, new_students, ebitda
        );

        state.units = units;
        state.students = Some(students);

        Ok(SegmentYear {
            segment: self.segment,
            units,
            new_units,
            students,
            new_students,
            revenue,
            recurring_cost,
            marketing,
            facilities_cost,
            ebitda,
            capex,
            timeback,
        })
    }

    /// Students to recruit this period
    ///
    /// With no prior period every student is new. Afterwards, students
    /// rolling off at the end of their tenure must be replaced on top of
    /// net growth over the organically retained base.
    fn new_students(&self, previous: Option<u64>, current: u64) -> Option<u64> {
        let Some(previous) = previous else {
            return Some(current);
        };
        let a = self.assumptions;
        let retained = whole(previous as f64 * (1.0 - a.organic_churn))?;
        let rolled_off = whole(previous as f64 / a.avg_student_tenure)?;
        let needed = i128::from(current) - i128::from(retained) + i128::from(rolled_off);
        u64::try_from(needed.max(0)).ok()
    }
}
