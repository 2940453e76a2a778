//! Error types shared by the engine and the scenario runners

use thiserror::Error;

use crate::assumptions::Segment;

/// Errors raised before or while running a projection
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("parameter {key} must be a positive finite number, got {value}")]
    InvalidParameter { key: &'static str, value: f64 },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("invalid assumptions for {segment}: {reason}")]
    InvalidAssumption { segment: Segment, reason: String },

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
