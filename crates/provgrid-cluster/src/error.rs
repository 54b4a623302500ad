//! Registry error types.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A count was reported for a node that has not joined.
    #[error("unknown node: {0}")]
    UnknownNode(String),
}
