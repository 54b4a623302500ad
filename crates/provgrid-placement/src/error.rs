//! Placement error types.

use thiserror::Error;

pub type PlacementResult<T> = Result<T, PlacementError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Negative desired count or a cap below the `-1` sentinel.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The snapshot had no nodes. Not fatal; membership may change
    /// before the next tick.
    #[error("no eligible nodes for service {service}")]
    NoEligibleNodes { service: String },
}

impl PlacementError {
    /// Whether the control loop should simply try again next tick.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlacementError::NoEligibleNodes { .. })
    }
}
