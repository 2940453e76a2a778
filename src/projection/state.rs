//! Per-run state carried from one period to the next

use crate::assumptions::{AssumptionSet, CapacityModel, FillRateCurve};

/// Open facilities of one segment, counted by age
///
/// Bucket `i` holds facilities opened `i` periods ago; the last bucket
/// also holds every facility older than that. Sized to the fill-rate curve
/// so memory and work per period do not grow with the facility count.
/// Owned by a single projection run and dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortAgeRegistry {
    counts: Vec<u64>,
}

impl CohortAgeRegistry {
    /// Empty registry with `buckets` age buckets (at least one)
    pub fn new(buckets: usize) -> Self {
        Self {
            counts: vec![0; buckets.max(1)],
        }
    }

    /// Registry seeded with `count` facilities that are already at `age`
    pub fn with_existing(buckets: usize, count: u64, age: u32) -> Self {
        let mut registry = Self::new(buckets);
        let last = registry.counts.len() - 1;
        registry.counts[(age as usize).min(last)] = count;
        registry
    }

    /// Age every facility by one period, then open `new_units` at age zero
    ///
    /// The counts always sum to the segment's unit total, which the tier
    /// model keeps within `u64`.
    pub fn advance(&mut self, new_units: u64) {
        let last = self.counts.len() - 1;
        if last == 0 {
            self.counts[0] += new_units;
            return;
        }
        let maturing = self.counts[last - 1];
        self.counts.copy_within(0..last - 1, 1);
        self.counts[last] += maturing;
        self.counts[0] = new_units;
    }

    /// Expected students across all facilities (unrounded)
    pub fn occupancy(&self, curve: &FillRateCurve, capacity_per_unit: f64) -> f64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(age, &count)| count as f64 * capacity_per_unit * curve.get_rate(age as u32))
            .sum()
    }

    /// Total facilities open
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Facility counts by age bucket
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

/// Closing state of one segment after a period
#[derive(Debug, Clone)]
pub struct SegmentState {
    /// Units open at the end of the last period
    pub units: u64,
    /// Students enrolled in the last period; `None` before the first period
    pub students: Option<u64>,
    /// Facility ages, for cohort segments only
    pub registry: Option<CohortAgeRegistry>,
}

impl SegmentState {
    /// State before the first period
    pub fn opening(assumptions: &AssumptionSet) -> Self {
        let registry = match assumptions.capacity_model {
            CapacityModel::Cohort => Some(CohortAgeRegistry::with_existing(
                assumptions.fill_rates.len(),
                assumptions.initial_units,
                assumptions.fill_rates.mature_age(),
            )),
            CapacityModel::Direct => None,
        };

        Self {
            units: assumptions.initial_units,
            students: None,
            registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_ages_then_appends() {
        let mut registry = CohortAgeRegistry::new(4);
        registry.advance(2);
        assert_eq!(registry.counts(), &[2, 0, 0, 0]);

        registry.advance(1);
        assert_eq!(registry.counts(), &[1, 2, 0, 0]);

        registry.advance(0);
        assert_eq!(registry.counts(), &[0, 1, 2, 0]);
        assert_eq!(registry.total(), 3);
    }

    #[test]
    fn test_mature_bucket_accumulates() {
        let mut registry = CohortAgeRegistry::new(3);
        registry.advance(5);
        registry.advance(1);
        registry.advance(0);
        assert_eq!(registry.counts(), &[0, 1, 5]);

        registry.advance(2);
        assert_eq!(registry.counts(), &[2, 0, 6]);
        registry.advance(0);
        assert_eq!(registry.counts(), &[0, 2, 6]);
        assert_eq!(registry.total(), 8);
    }

    #[test]
    fn test_single_bucket_registry() {
        let mut registry = CohortAgeRegistry::new(1);
        registry.advance(3);
        registry.advance(4);
        assert_eq!(registry.counts(), &[7]);
    }

    #[test]
    fn test_occupancy_follows_curve() {
        let curve = FillRateCurve::new(vec![0.0, 0.5, 1.0]);
        let mut registry = CohortAgeRegistry::new(curve.len());

        registry.advance(2);
        assert_eq!(registry.occupancy(&curve, 100.0), 0.0);

        registry.advance(1);
        // two at age 1, one at age 0
        assert_eq!(registry.occupancy(&curve, 100.0), 100.0);

        registry.advance(0);
        registry.advance(0);
        // all three mature
        assert_eq!(registry.occupancy(&curve, 100.0), 300.0);
    }

    #[test]
    fn test_large_counts_stay_compact() {
        let curve = FillRateCurve::new(vec![0.0, 0.5, 1.0]);
        let mut registry = CohortAgeRegistry::new(curve.len());
        registry.advance(1_000_000_000_000);
        registry.advance(1_000_000_000_000);

        assert_eq!(registry.counts().len(), 3);
        assert_eq!(registry.total(), 2_000_000_000_000);
        assert_eq!(registry.occupancy(&curve, 2.0), 1_000_000_000_000.0);
    }

    #[test]
    fn test_opening_state_seeds_mature_facilities() {
        let mut mid = AssumptionSet::default_mid_sized();
        mid.initial_units = 3;

        let state = SegmentState::opening(&mid);
        let registry = state.registry.unwrap();
        assert_eq!(registry.counts(), &[0, 0, 0, 3]);
        assert_eq!(state.units, 3);
        assert!(state.students.is_none());
    }

    #[test]
    fn test_direct_segments_have_no_registry() {
        let state = SegmentState::opening(&AssumptionSet::default_micro());
        assert!(state.registry.is_none());
        assert_eq!(state.units, 6);
    }
}
