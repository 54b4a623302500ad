//! Control loop error types.

use thiserror::Error;

/// Errors surfaced by the control loop to its owner.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("placement error: {0}")]
    Placement(#[from] provgrid_placement::PlacementError),

    #[error("misconfigured control loop: {0}")]
    Config(String),

    #[error("actuator error: {0}")]
    Actuator(#[from] anyhow::Error),
}

pub type ControlResult<T> = Result<T, ControlError>;
