//! Registry error types.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No session for the channel.
    #[error("no broadcaster session for channel {0}")]
    NotFound(String),
}
