//! Revision errors

use thiserror::Error;

/// Result type for revision operations
pub type RevisionResult<T> = Result<T, RevisionError>;

/// Revision errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionError {
    /// Revision id does not have the `<generation>-<hash>` shape
    #[error("Invalid revision id: {0}")]
    InvalidRevId(String),
}
