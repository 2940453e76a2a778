//! Per-segment unit economics: tuition, recurring costs, fill rates, facilities

use serde::{Deserialize, Serialize};

use super::Segment;
use crate::error::{ModelError, Result};

/// How a segment turns open units into enrolled students
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapacityModel {
    /// Existing units are full; new units enroll at the first-year ramp rate
    Direct,
    /// Each facility fills along the curve according to its own age
    Cohort,
}

/// Occupancy fraction by facility age (years since opening)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillRateCurve {
    rates: Vec<f64>,
}

impl FillRateCurve {
    pub fn new(rates: Vec<f64>) -> Self {
        Self { rates }
    }

    /// Fill rate at a given age; ages past the end of the curve use the last value
    pub fn get_rate(&self, age: u32) -> f64 {
        let idx = (age as usize).min(self.rates.len().saturating_sub(1));
        self.rates.get(idx).copied().unwrap_or(0.0)
    }

    /// Fill rate applied to capacity opened this period
    pub fn first_year_rate(&self) -> f64 {
        self.get_rate(0)
    }

    /// Age at which a facility reaches its final fill rate
    pub fn mature_age(&self) -> u32 {
        self.rates.len().saturating_sub(1) as u32
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let Some(&last) = self.rates.last() else {
            return Err("fill-rate curve is empty".to_string());
        };
        if self.rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err("fill rates must lie within [0, 1]".to_string());
        }
        if self.rates.windows(2).any(|w| w[1] < w[0]) {
            return Err("fill-rate curve must be non-decreasing".to_string());
        }
        if (last - 1.0).abs() > 1e-12 {
            return Err(format!("fill-rate curve must end at 1.0, ends at {last}"));
        }
        Ok(())
    }
}

/// One named per-student recurring cost component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    pub name: String,
    pub per_student: f64,
}

impl CostLine {
    pub fn new(name: &str, per_student: f64) -> Self {
        Self {
            name: name.to_string(),
            per_student,
        }
    }
}

/// A physical facility type used when blending renovated and new-build sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityType {
    pub students: f64,
    pub purchase_cost: f64,
    pub construction_cost: f64,
}

impl FacilityType {
    pub fn unit_cost(&self) -> f64 {
        self.purchase_cost + self.construction_cost
    }
}

/// Where the capital cost of a newly opened facility comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CapitalCost {
    /// Weighted average of renovated and new-build sites
    #[serde(rename_all = "camelCase")]
    Blended {
        renovated: FacilityType,
        new_build: FacilityType,
        /// Share of renovated sites (0.0 to 1.0)
        blend_ratio: f64,
    },
    /// Per-unit cost supplied by the run parameters (`flagshipCapex`)
    PerUnitParameter,
}

impl CapitalCost {
    /// Blended per-unit capital cost, or `None` when the parameters supply it
    pub fn blended_unit_cost(&self) -> Option<f64> {
        match self {
            CapitalCost::Blended {
                renovated,
                new_build,
                blend_ratio,
            } => Some(
                renovated.unit_cost() * blend_ratio + new_build.unit_cost() * (1.0 - blend_ratio),
            ),
            CapitalCost::PerUnitParameter => None,
        }
    }

    /// Blended students per site, if this is a blend
    pub fn blended_capacity(&self) -> Option<f64> {
        match self {
            CapitalCost::Blended {
                renovated,
                new_build,
                blend_ratio,
            } => Some(renovated.students * blend_ratio + new_build.students * (1.0 - blend_ratio)),
            CapitalCost::PerUnitParameter => None,
        }
    }
}

/// Facility economics for capacity-constrained segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub capital: CapitalCost,
    /// Annual operating cost per open facility
    pub annual_cost_per_unit: f64,
    /// Property valuation per facility held at the end of the horizon
    pub property_value_per_unit: f64,
}

/// Immutable unit-economic constants for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionSet {
    pub capacity_model: CapacityModel,
    pub tuition: f64,
    pub timeback_per_student: f64,
    pub recurring_costs: Vec<CostLine>,
    /// Students per unit (1 for virtual seats)
    pub capacity_per_unit: f64,
    pub tof_marketing: f64,
    pub bof_marketing: f64,
    pub fill_rates: FillRateCurve,
    /// Average years a student stays enrolled
    pub avg_student_tenure: f64,
    /// Annual voluntary churn
    pub organic_churn: f64,
    /// Units already open before the first period
    #[serde(default)]
    pub initial_units: u64,
    #[serde(default)]
    pub facility: Option<Facility>,
}

impl AssumptionSet {
    /// Virtual school: units are student seats
    pub fn default_virtual() -> Self {
        Self {
            capacity_model: CapacityModel::Direct,
            tuition: 10_474.0,
            timeback_per_student: 2_000.0,
            recurring_costs: vec![
                CostLine::new("headcount", 3_000.0),
                CostLine::new("programs", 1_000.0),
                CostLine::new("misc", 750.0),
                CostLine::new("timeback", 2_000.0),
            ],
            capacity_per_unit: 1.0,
            tof_marketing: 500.0,
            bof_marketing: 2_000.0,
            fill_rates: FillRateCurve::new(vec![1.0]),
            avg_student_tenure: 2.5,
            organic_churn: 0.075,
            initial_units: 0,
            facility: None,
        }
    }

    /// Microschools: 25 students, 70% full in the opening year
    pub fn default_micro() -> Self {
        Self {
            capacity_model: CapacityModel::Direct,
            tuition: 15_000.0,
            timeback_per_student: 3_000.0,
            recurring_costs: vec![
                CostLine::new("coachSalary", 3_750.0),
                CostLine::new("realEstate", 2_500.0),
                CostLine::new("lifeSkills", 1_000.0),
                CostLine::new("misc", 1_250.0),
                CostLine::new("timeback", 3_000.0),
            ],
            capacity_per_unit: 25.0,
            tof_marketing: 500.0,
            bof_marketing: 2_500.0,
            fill_rates: FillRateCurve::new(vec![0.70, 1.0]),
            avg_student_tenure: 4.0,
            organic_churn: 0.05,
            initial_units: 6,
            facility: None,
        }
    }

    /// Mid-sized campuses: even blend of renovated (400) and new-build (1000) sites
    pub fn default_mid_sized() -> Self {
        let capital = CapitalCost::Blended {
            renovated: FacilityType {
                students: 400.0,
                purchase_cost: 1_000_000.0,
                construction_cost: 14_000_000.0,
            },
            new_build: FacilityType {
                students: 1_000.0,
                purchase_cost: 10_000_000.0,
                construction_cost: 40_000_000.0,
            },
            blend_ratio: 0.5,
        };
        let capacity_per_unit = capital.blended_capacity().unwrap_or(700.0);

        Self {
            capacity_model: CapacityModel::Cohort,
            tuition: 25_000.0,
            timeback_per_student: 5_000.0,
            recurring_costs: vec![CostLine::new("operations", 12_000.0)],
            capacity_per_unit,
            tof_marketing: 1_000.0,
            bof_marketing: 4_000.0,
            fill_rates: FillRateCurve::new(vec![0.0, 0.33, 0.67, 1.0]),
            avg_student_tenure: 5.0,
            organic_churn: 0.05,
            initial_units: 0,
            facility: Some(Facility {
                capital,
                annual_cost_per_unit: 750_000.0,
                property_value_per_unit: 26_000_000.0,
            }),
        }
    }

    /// Flagship campuses: 1500 students, capital cost set per scenario
    pub fn default_flagship() -> Self {
        Self {
            capacity_model: CapacityModel::Cohort,
            tuition: 50_000.0,
            timeback_per_student: 10_000.0,
            recurring_costs: vec![CostLine::new("operations", 15_000.0)],
            capacity_per_unit: 1_500.0,
            tof_marketing: 2_000.0,
            bof_marketing: 8_000.0,
            fill_rates: FillRateCurve::new(vec![0.0, 0.0, 0.33, 0.67, 1.0]),
            avg_student_tenure: 6.0,
            organic_churn: 0.04,
            initial_units: 0,
            facility: Some(Facility {
                capital: CapitalCost::PerUnitParameter,
                annual_cost_per_unit: 2_500_000.0,
                property_value_per_unit: 60_000_000.0,
            }),
        }
    }

    /// Sum of all per-student recurring cost lines
    pub fn recurring_cost_per_student(&self) -> f64 {
        self.recurring_costs.iter().map(|c| c.per_student).sum()
    }

    /// Marketing cost to acquire one new student
    pub fn marketing_per_new_student(&self) -> f64 {
        self.tof_marketing + self.bof_marketing
    }

    /// Capital cost of one new unit, given the scenario's per-unit capex
    pub fn unit_capital_cost(&self, parameter_capex: f64) -> f64 {
        match &self.facility {
            Some(facility) => facility
                .capital
                .blended_unit_cost()
                .unwrap_or(parameter_capex),
            None => 0.0,
        }
    }

    pub fn facilities_cost_per_unit(&self) -> f64 {
        self.facility.as_ref().map_or(0.0, |f| f.annual_cost_per_unit)
    }

    pub fn property_value_per_unit(&self) -> f64 {
        self.facility.as_ref().map_or(0.0, |f| f.property_value_per_unit)
    }

    /// Check the invariants the projection relies on
    pub fn validate(&self, segment: Segment) -> Result<()> {
        let invalid = |reason: String| ModelError::InvalidAssumption { segment, reason };

        self.fill_rates.validate().map_err(invalid)?;

        let money = [
            ("tuition", self.tuition),
            ("timebackPerStudent", self.timeback_per_student),
            ("tofMarketing", self.tof_marketing),
            ("bofMarketing", self.bof_marketing),
        ];
        for (name, value) in money {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be non-negative, got {value}")));
            }
        }
        for line in &self.recurring_costs {
            if !line.per_student.is_finite() || line.per_student < 0.0 {
                return Err(invalid(format!(
                    "cost line {} must be non-negative, got {}",
                    line.name, line.per_student
                )));
            }
        }
        if !self.capacity_per_unit.is_finite() || self.capacity_per_unit <= 0.0 {
            return Err(invalid(format!(
                "capacityPerUnit must be positive, got {}",
                self.capacity_per_unit
            )));
        }
        if !self.avg_student_tenure.is_finite() || self.avg_student_tenure <= 0.0 {
            return Err(invalid(format!(
                "avgStudentTenure must be positive, got {}",
                self.avg_student_tenure
            )));
        }
        if !(0.0..1.0).contains(&self.organic_churn) {
            return Err(invalid(format!(
                "organicChurn must lie within [0, 1), got {}",
                self.organic_churn
            )));
        }

        match (self.capacity_model, &self.facility) {
            (CapacityModel::Cohort, None) => {
                return Err(invalid("cohort segments need facility economics".to_string()));
            }
            (CapacityModel::Direct, Some(_)) => {
                return Err(invalid("direct segments carry no facilities".to_string()));
            }
            _ => {}
        }

        if let Some(facility) = &self.facility {
            let values = [
                ("annualCostPerUnit", facility.annual_cost_per_unit),
                ("propertyValuePerUnit", facility.property_value_per_unit),
            ];
            for (name, value) in values {
                if !value.is_finite() || value < 0.0 {
                    return Err(invalid(format!("{name} must be non-negative, got {value}")));
                }
            }
            if let CapitalCost::Blended {
                renovated,
                new_build,
                blend_ratio,
            } = &facility.capital
            {
                if !(0.0..=1.0).contains(blend_ratio) {
                    return Err(invalid(format!(
                        "blendRatio must lie within [0, 1], got {blend_ratio}"
                    )));
                }
                for (kind, site) in [("renovated", renovated), ("newBuild", new_build)] {
                    let costs = [site.purchase_cost, site.construction_cost];
                    if costs.iter().any(|c| !c.is_finite() || *c < 0.0) {
                        return Err(invalid(format!("{kind} capital costs must be non-negative")));
                    }
                    if !site.students.is_finite() || site.students <= 0.0 {
                        return Err(invalid(format!(
                            "{kind} students must be positive, got {}",
                            site.students
                        )));
                    }
                }
                if let Some(blended) = facility.capital.blended_capacity() {
                    if (blended - self.capacity_per_unit).abs() > 1e-9 * blended.max(1.0) {
                        return Err(invalid(format!(
                            "capacityPerUnit {} does not match the blended site capacity {blended}",
                            self.capacity_per_unit
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rate_lookup_clamps() {
        let curve = FillRateCurve::new(vec![0.0, 0.33, 0.67, 1.0]);

        assert_eq!(curve.get_rate(0), 0.0);
        assert_eq!(curve.get_rate(2), 0.67);
        assert_eq!(curve.get_rate(3), 1.0);
        assert_eq!(curve.get_rate(10), 1.0);
        assert_eq!(curve.mature_age(), 3);
    }

    #[test]
    fn test_mid_sized_blend() {
        let mid = AssumptionSet::default_mid_sized();

        // 400 * 0.5 + 1000 * 0.5
        assert_eq!(mid.capacity_per_unit, 700.0);
        // (1M + 14M) * 0.5 + (10M + 40M) * 0.5
        assert_eq!(mid.unit_capital_cost(75_000_000.0), 32_500_000.0);
    }

    #[test]
    fn test_flagship_capex_from_parameters() {
        let flagship = AssumptionSet::default_flagship();
        assert_eq!(flagship.unit_capital_cost(60_000_000.0), 60_000_000.0);

        let virtual_school = AssumptionSet::default_virtual();
        assert_eq!(virtual_school.unit_capital_cost(60_000_000.0), 0.0);
    }

    #[test]
    fn test_recurring_cost_sum() {
        assert_eq!(AssumptionSet::default_virtual().recurring_cost_per_student(), 6_750.0);
        assert_eq!(AssumptionSet::default_micro().recurring_cost_per_student(), 11_500.0);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(AssumptionSet::default_virtual().validate(Segment::Virtual).is_ok());
        assert!(AssumptionSet::default_micro().validate(Segment::Micro).is_ok());
        assert!(AssumptionSet::default_mid_sized().validate(Segment::MidSized).is_ok());
        assert!(AssumptionSet::default_flagship().validate(Segment::Flagship).is_ok());
    }

    #[test]
    fn test_rejects_decreasing_curve() {
        let mut mid = AssumptionSet::default_mid_sized();
        mid.fill_rates = FillRateCurve::new(vec![0.5, 0.4, 1.0]);

        let err = mid.validate(Segment::MidSized).unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn test_rejects_curve_not_ending_full() {
        let mut micro = AssumptionSet::default_micro();
        micro.fill_rates = FillRateCurve::new(vec![0.7, 0.9]);
        assert!(micro.validate(Segment::Micro).is_err());
    }

    #[test]
    fn test_rejects_negative_cost_and_missing_facility() {
        let mut virtual_school = AssumptionSet::default_virtual();
        virtual_school.recurring_costs.push(CostLine::new("rebate", -10.0));
        assert!(virtual_school.validate(Segment::Virtual).is_err());

        let mut flagship = AssumptionSet::default_flagship();
        flagship.facility = None;
        assert!(flagship.validate(Segment::Flagship).is_err());
    }

    #[test]
    fn test_rejects_non_finite_facility_figures() {
        let mut flagship = AssumptionSet::default_flagship();
        if let Some(facility) = flagship.facility.as_mut() {
            facility.annual_cost_per_unit = f64::NAN;
        }
        assert!(flagship.validate(Segment::Flagship).is_err());

        let mut flagship = AssumptionSet::default_flagship();
        if let Some(facility) = flagship.facility.as_mut() {
            facility.property_value_per_unit = f64::INFINITY;
        }
        assert!(flagship.validate(Segment::Flagship).is_err());

        let mut mid = AssumptionSet::default_mid_sized();
        if let Some(Facility {
            capital: CapitalCost::Blended { new_build, .. },
            ..
        }) = mid.facility.as_mut()
        {
            new_build.construction_cost = f64::INFINITY;
        }
        let err = mid.validate(Segment::MidSized).unwrap_err();
        assert!(err.to_string().contains("newBuild"));
    }

    #[test]
    fn test_capacity_must_match_blend() {
        let mut mid = AssumptionSet::default_mid_sized();
        mid.capacity_per_unit = 900.0;

        let err = mid.validate(Segment::MidSized).unwrap_err();
        assert!(err.to_string().contains("blended site capacity"));

        mid.capacity_per_unit = 700.0;
        assert!(mid.validate(Segment::MidSized).is_ok());
    }
}
