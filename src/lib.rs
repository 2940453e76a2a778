//! Tier Projection - ten-year growth model for a multi-segment school network
//!
//! This library provides:
//! - Per-segment projection of units, students, revenue, costs and capex
//! - Network aggregation, cumulative cash flow and terminal valuation
//! - Monte Carlo sampling over parameter ranges
//! - One-parameter sensitivity sweeps
//! - Bisection goal seek on a target metric

pub mod assumptions;
pub mod error;
pub mod params;
pub mod projection;
pub mod scenario;
pub mod trajectory;

// Re-export commonly used types
pub use assumptions::{AssumptionBook, AssumptionSet, Segment};
pub use error::{ModelError, Result};
pub use params::{ParameterKey, Parameters, Scenario};
pub use projection::{project, ModelResult, ProjectionEngine, Summary, YearResult};
pub use scenario::{
    goal_seek, run_monte_carlo, run_sensitivity, CancelFlag, GoalSeekConfig, GoalSeekResult,
    GoalSeekStatus, Metric, MonteCarloConfig, MonteCarloSummary, RandomSource, ScenarioRunner,
    SeededSource, SensitivityPoint,
};
pub use trajectory::{GrowthTrajectory, Trajectories};
