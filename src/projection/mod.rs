//! Projection engine for the multi-segment growth model

mod state;
mod tier;
mod engine;
mod cashflows;
pub mod export;

pub use state::{CohortAgeRegistry, SegmentState};
pub use tier::TierModel;
pub use engine::{project, ProjectionEngine};
pub use cashflows::{ModelResult, SegmentYear, Summary, YearResult};
pub use export::{write_ledger, write_ledger_to_path};

// ============================================================================
// Horizon
// ============================================================================
// The model runs school years SY26 through SY36: the opening year plus a
// ten-year outlook.

/// Number of projected periods
pub const HORIZON: usize = 11;

/// Two-digit school year of period 0
pub const FIRST_SCHOOL_YEAR: usize = 26;

/// Display label for a period, e.g. `SY26` for period 0
pub fn period_label(period: usize) -> String {
    format!("SY{}", FIRST_SCHOOL_YEAR + period)
}
