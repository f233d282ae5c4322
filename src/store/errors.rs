//! Store errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Named database does not exist and creation was not requested
    #[error("Database not found: {0}")]
    DbNotFound(String),

    /// Document or revision not present
    #[error("Not found")]
    NotFound,

    /// Stored bytes failed to decode
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Underlying key-value engine failure, propagated verbatim
    #[error("Storage backend error: {0}")]
    Backend(String),
}
