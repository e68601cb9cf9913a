//! Store and query errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure
///
/// Messages are flattened to strings so the error stays `Clone` and can cross
/// thread boundaries regardless of backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Database engine error
    #[error("store db error: {0}")]
    Db(String),

    /// Filesystem error
    #[error("store io error: {0}")]
    Io(String),

    /// A row or record could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// Configuration or stored data is invalid
    #[error("store invalid: {0}")]
    Invalid(String),

    /// Store cannot serve requests (poisoned lock, closed handle)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}

/// Read-side failure seen by HTTP collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No reading stored yet
    #[error("no reading found")]
    NotFound,

    /// Underlying store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
