//! Document errors

use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Malformed document input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Body is not a JSON object
    #[error("Document body must be a JSON object")]
    NotAnObject,

    /// A reserved field carries the wrong JSON type
    #[error("Field `{0}` must be a string")]
    InvalidField(&'static str),

    /// The operation does not accept a `_rev` field
    #[error("`_rev` is not allowed here")]
    UnexpectedRev,

    /// The operation requires an `_id` field
    #[error("Document is missing `_id`")]
    MissingId,

    /// put_rev was called with an empty revision history
    #[error("Revision history is empty")]
    EmptyHistory,
}
