//! Waiter error types.

use std::time::Duration;

use thiserror::Error;

pub type WaitResult<T> = Result<T, WaitError>;

/// Why a wait ended without the condition holding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The budget ran out. `last` is the description captured with the
    /// final failed check.
    #[error("timed out after {waited:?} waiting for: {last}")]
    Timeout { waited: Duration, last: String },

    /// The cancel token fired before the budget ran out.
    #[error("cancelled while waiting for: {last}")]
    Cancelled { last: String },
}

impl WaitError {
    /// Description of the state observed last.
    pub fn last_description(&self) -> &str {
        match self {
            WaitError::Timeout { last, .. } | WaitError::Cancelled { last } => last,
        }
    }
}
