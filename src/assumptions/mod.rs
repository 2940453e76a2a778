//! Segment definitions and the per-segment assumption book

mod unit_economics;
pub mod loader;

pub use unit_economics::{
    AssumptionSet, CapacityModel, CapitalCost, CostLine, Facility, FacilityType, FillRateCurve,
};
pub use loader::{load_assumptions, load_assumptions_from_reader};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One of the organization's delivery formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Segment {
    Virtual,
    Micro,
    MidSized,
    Flagship,
}

impl Segment {
    /// All segments in reporting order
    pub const ALL: [Segment; 4] = [
        Segment::Virtual,
        Segment::Micro,
        Segment::MidSized,
        Segment::Flagship,
    ];

    pub fn index(self) -> usize {
        match self {
            Segment::Virtual => 0,
            Segment::Micro => 1,
            Segment::MidSized => 2,
            Segment::Flagship => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Virtual => "virtual",
            Segment::Micro => "micro",
            Segment::MidSized => "midSized",
            Segment::Flagship => "flagship",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assumptions for every segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionBook {
    #[serde(rename = "virtual")]
    pub virtual_school: AssumptionSet,
    pub micro: AssumptionSet,
    pub mid_sized: AssumptionSet,
    pub flagship: AssumptionSet,
}

impl Default for AssumptionBook {
    fn default() -> Self {
        Self {
            virtual_school: AssumptionSet::default_virtual(),
            micro: AssumptionSet::default_micro(),
            mid_sized: AssumptionSet::default_mid_sized(),
            flagship: AssumptionSet::default_flagship(),
        }
    }
}

impl AssumptionBook {
    pub fn get(&self, segment: Segment) -> &AssumptionSet {
        match segment {
            Segment::Virtual => &self.virtual_school,
            Segment::Micro => &self.micro,
            Segment::MidSized => &self.mid_sized,
            Segment::Flagship => &self.flagship,
        }
    }

    pub fn get_mut(&mut self, segment: Segment) -> &mut AssumptionSet {
        match segment {
            Segment::Virtual => &mut self.virtual_school,
            Segment::Micro => &mut self.micro,
            Segment::MidSized => &mut self.mid_sized,
            Segment::Flagship => &mut self.flagship,
        }
    }

    /// Validate every segment's assumptions
    pub fn validate(&self) -> Result<()> {
        for segment in Segment::ALL {
            self.get(segment).validate(segment)?;
        }
        Ok(())
    }
}
