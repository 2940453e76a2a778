//! Unconstrained growth paths per segment
//!
//! A trajectory gives the target unit count (students for virtual, schools
//! otherwise) for every period before scenario multipliers are applied.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::assumptions::Segment;
use crate::error::{ModelError, Result};
use crate::projection::HORIZON;

/// Target unit counts for one segment, one per period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowthTrajectory([f64; HORIZON]);

impl GrowthTrajectory {
    pub fn new(targets: [f64; HORIZON]) -> Self {
        Self(targets)
    }

    /// Same target in every period
    pub fn flat(target: f64) -> Self {
        Self([target; HORIZON])
    }

    pub fn target(&self, period: usize) -> f64 {
        self.0[period]
    }

    pub fn targets(&self) -> &[f64; HORIZON] {
        &self.0
    }
}

/// One growth trajectory per segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectories {
    #[serde(rename = "virtual")]
    pub virtual_students: GrowthTrajectory,
    pub micro_schools: GrowthTrajectory,
    pub mid_sized_schools: GrowthTrajectory,
    pub flagship_schools: GrowthTrajectory,
}

impl Default for Trajectories {
    fn default() -> Self {
        Self {
            virtual_students: GrowthTrajectory::new([
                10_000.0, 20_000.0, 30_000.0, 40_000.0, 50_000.0, 60_000.0, 70_000.0, 80_000.0,
                90_000.0, 100_000.0, 100_000.0,
            ]),
            micro_schools: GrowthTrajectory::new([
                20.0, 60.0, 180.0, 540.0, 1_620.0, 4_000.0, 4_000.0, 4_000.0, 4_000.0, 4_000.0,
                4_000.0,
            ]),
            mid_sized_schools: GrowthTrajectory::new([
                2.0, 10.0, 20.0, 50.0, 100.0, 150.0, 200.0, 250.0, 400.0, 625.0, 800.0,
            ]),
            flagship_schools: GrowthTrajectory::new([
                0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0,
            ]),
        }
    }
}

impl Trajectories {
    /// Every segment flat at zero
    pub fn zero() -> Self {
        Self {
            virtual_students: GrowthTrajectory::flat(0.0),
            micro_schools: GrowthTrajectory::flat(0.0),
            mid_sized_schools: GrowthTrajectory::flat(0.0),
            flagship_schools: GrowthTrajectory::flat(0.0),
        }
    }

    pub fn get(&self, segment: Segment) -> &GrowthTrajectory {
        match segment {
            Segment::Virtual => &self.virtual_students,
            Segment::Micro => &self.micro_schools,
            Segment::MidSized => &self.mid_sized_schools,
            Segment::Flagship => &self.flagship_schools,
        }
    }

    pub fn get_mut(&mut self, segment: Segment) -> &mut GrowthTrajectory {
        match segment {
            Segment::Virtual => &mut self.virtual_students,
            Segment::Micro => &mut self.micro_schools,
            Segment::MidSized => &mut self.mid_sized_schools,
            Segment::Flagship => &mut self.flagship_schools,
        }
    }

    /// Targets must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for segment in Segment::ALL {
            let targets = self.get(segment).targets();
            if let Some((period, value)) = targets
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(ModelError::InvalidTrajectory(format!(
                    "{segment} target for period {period} is {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One row of a trajectory CSV
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrajectoryRow {
    period: usize,
    #[serde(rename = "virtual")]
    virtual_students: f64,
    micro: f64,
    mid_sized: f64,
    flagship: f64,
}

/// Load trajectories from a CSV file with columns
/// `period,virtual,micro,midSized,flagship` and one row per period
pub fn load_trajectories<P: AsRef<Path>>(path: P) -> Result<Trajectories> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let trajectories = load_trajectories_from_reader(file)?;
    info!("Loaded trajectories from {}", path.display());
    Ok(trajectories)
}

/// Load trajectories from any CSV reader
pub fn load_trajectories_from_reader<R: Read>(reader: R) -> Result<Trajectories> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trajectories = Trajectories::zero();
    let mut seen = [false; HORIZON];

    for row in rdr.deserialize() {
        let row: TrajectoryRow = row?;
        if row.period >= HORIZON {
            return Err(ModelError::InvalidTrajectory(format!(
                "period {} is outside the {HORIZON}-period horizon",
                row.period
            )));
        }
        if seen[row.period] {
            return Err(ModelError::InvalidTrajectory(format!(
                "period {} appears more than once",
                row.period
            )));
        }
        seen[row.period] = true;

        trajectories.virtual_students.0[row.period] = row.virtual_students;
        trajectories.micro_schools.0[row.period] = row.micro;
        trajectories.mid_sized_schools.0[row.period] = row.mid_sized;
        trajectories.flagship_schools.0[row.period] = row.flagship;
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(ModelError::InvalidTrajectory(format!(
            "period {missing} is missing"
        )));
    }

    trajectories.validate()?;
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_from(trajectories: &Trajectories) -> String {
        let mut out = String::from("period,virtual,micro,midSized,flagship\n");
        for period in 0..HORIZON {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                period,
                trajectories.virtual_students.target(period),
                trajectories.micro_schools.target(period),
                trajectories.mid_sized_schools.target(period),
                trajectories.flagship_schools.target(period),
            ));
        }
        out
    }

    #[test]
    fn test_default_final_targets() {
        let t = Trajectories::default();
        assert_eq!(t.get(Segment::Virtual).target(HORIZON - 1), 100_000.0);
        assert_eq!(t.get(Segment::Micro).target(HORIZON - 1), 4_000.0);
        assert_eq!(t.get(Segment::MidSized).target(HORIZON - 1), 800.0);
        assert_eq!(t.get(Segment::Flagship).target(HORIZON - 1), 4.0);
    }

    #[test]
    fn test_load_from_csv() {
        let csv = csv_from(&Trajectories::default());
        let loaded = load_trajectories_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(loaded, Trajectories::default());
    }

    #[test]
    fn test_missing_period_rejected() {
        let csv = "period,virtual,micro,midSized,flagship\n0,1,1,1,0\n";
        let err = load_trajectories_from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("period 1 is missing"));
    }

    #[test]
    fn test_out_of_horizon_period_rejected() {
        let csv = "period,virtual,micro,midSized,flagship\n11,1,1,1,0\n";
        assert!(matches!(
            load_trajectories_from_reader(csv.as_bytes()),
            Err(ModelError::InvalidTrajectory(_))
        ));
    }

    #[test]
    fn test_negative_target_rejected() {
        let mut t = Trajectories::default();
        t.get_mut(Segment::Micro).0[3] = -5.0;
        assert!(t.validate().is_err());
    }
}
