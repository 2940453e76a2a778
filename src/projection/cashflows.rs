//! Yearly ledger rows and the projection result

use serde::{Deserialize, Serialize};

use super::period_label;
use crate::assumptions::Segment;
use crate::error::{ModelError, Result};

/// One segment's figures for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentYear {
    pub segment: Segment,
    /// Units open at period end (students for virtual, schools otherwise)
    pub units: u64,
    pub new_units: u64,
    pub students: u64,
    /// Students that had to be recruited this period
    pub new_students: u64,
    pub revenue: f64,
    pub recurring_cost: f64,
    pub marketing: f64,
    pub facilities_cost: f64,
    pub ebitda: f64,
    pub capex: f64,
    /// Reporting metric only, already part of recurring cost
    pub timeback: f64,
}

/// All segments plus totals for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearResult {
    pub period: usize,
    pub label: String,
    /// One entry per segment, in `Segment::ALL` order
    pub segments: Vec<SegmentYear>,

    pub total_students: u64,
    pub total_revenue: f64,
    pub total_ebitda: f64,
    pub total_capex: f64,
    pub total_timeback: f64,
    pub net_cash_flow: f64,

    // Filled by the finalization pass
    pub cumulative_cash_flow: f64,
    pub cumulative_capex: f64,

    pub ebitda_margin: f64,
    pub timeback_pct: f64,
}

impl YearResult {
    /// Build a period's row from its segment figures; cumulative fields start at zero
    pub fn from_segments(period: usize, segments: Vec<SegmentYear>) -> Result<Self> {
        let total_students = segments
            .iter()
            .try_fold(0u64, |total, s| total.checked_add(s.students))
            .ok_or_else(|| {
                ModelError::InvalidTrajectory(format!(
                    "total students in {} exceed the largest representable count",
                    period_label(period)
                ))
            })?;
        let total_revenue: f64 = segments.iter().map(|s| s.revenue).sum();
        let total_ebitda: f64 = segments.iter().map(|s| s.ebitda).sum();
        let total_capex: f64 = segments.iter().map(|s| s.capex).sum();
        let total_timeback: f64 = segments.iter().map(|s| s.timeback).sum();

        Ok(Self {
            period,
            label: period_label(period),
            segments,
            total_students,
            total_revenue,
            total_ebitda,
            total_capex,
            total_timeback,
            net_cash_flow: total_ebitda - total_capex,
            cumulative_cash_flow: 0.0,
            cumulative_capex: 0.0,
            ebitda_margin: ratio(total_ebitda, total_revenue),
            timeback_pct: ratio(total_timeback, total_revenue),
        })
    }

    pub fn segment(&self, segment: Segment) -> &SegmentYear {
        &self.segments[segment.index()]
    }
}

/// Headline figures of a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_students: u64,
    pub total_revenue: f64,
    pub total_ebitda: f64,
    pub ebitda_margin: f64,
    pub total_timeback: f64,
    pub timeback_pct: f64,
    pub cumulative_capex: f64,
    pub property_value: f64,
    pub terminal_value: f64,
    /// Largest cumulative cash deficit over the horizon
    pub peak_funding: f64,
    /// First period with positive cumulative cash flow
    pub breakeven: Option<usize>,
}

impl Summary {
    /// Breakeven period index, or -1 if cumulative cash flow never turns positive
    pub fn breakeven_index(&self) -> i64 {
        self.breakeven.map_or(-1, |p| p as i64)
    }
}

/// Full projection output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResult {
    pub years: Vec<YearResult>,
    pub summary: Summary,
}

impl ModelResult {
    pub fn final_year(&self) -> &YearResult {
        // The engine always produces a full horizon
        &self.years[self.years.len() - 1]
    }
}

/// Fill cumulative cash flow and capex in one left-to-right sweep
pub(crate) fn finalize_cumulative(years: &mut [YearResult]) {
    let mut cumulative_cash_flow = 0.0;
    let mut cumulative_capex = 0.0;
    for year in years {
        cumulative_cash_flow += year.total_ebitda - year.total_capex;
        cumulative_capex += year.total_capex;
        year.cumulative_cash_flow = cumulative_cash_flow;
        year.cumulative_capex = cumulative_capex;
    }
}

/// Deficit and breakeven from finalized years
pub(crate) fn funding_profile(years: &[YearResult]) -> (f64, Option<usize>) {
    let min_cash_flow = years
        .iter()
        .map(|y| y.cumulative_cash_flow)
        .fold(0.0_f64, f64::min);
    let breakeven = years.iter().position(|y| y.cumulative_cash_flow > 0.0);
    (min_cash_flow.abs(), breakeven)
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
