//! Database errors
//!
//! The error kinds callers of the façade see. Conflicts are reported
//! without retry; storage errors propagate verbatim; a writer crash is
//! absorbed by respawning and surfaces only when the retry also fails.

use std::fmt;

use thiserror::Error;

use crate::document::DocumentError;
use crate::revision::RevisionError;
use crate::store::StoreError;

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Why a write was rejected as a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Write without `_rev` targeting an existing live document
    DocExists,
    /// The supplied `_rev` is not a current leaf
    RevisionConflict,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DocExists => write!(f, "document already exists"),
            ConflictKind::RevisionConflict => write!(f, "revision is not a current leaf"),
        }
    }
}

/// Database errors
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// Unknown database, document, or revision
    #[error("Not found")]
    NotFound,

    /// Write rejected by conflict detection
    #[error("Document update conflict: {0}")]
    Conflict(ConflictKind),

    /// Malformed document input
    #[error("Bad document: {0}")]
    BadDoc(#[from] DocumentError),

    /// Malformed revision identifier in the input
    #[error("Bad document: {0}")]
    BadRev(#[from] RevisionError),

    /// Store name not registered
    #[error("Unknown store: {0}")]
    UnknownStore(String),

    /// The writer task is gone and could not be reached after respawn
    #[error("Database writer stopped")]
    WriterStopped,

    /// Underlying storage failure
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DatabaseError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => DatabaseError::NotFound,
            StoreError::DbNotFound(_) => DatabaseError::NotFound,
            other => DatabaseError::Store(other),
        }
    }
}

impl DatabaseError {
    /// User-visible status code for the HTTP collaborator
    pub fn status_code(&self) -> u16 {
        match self {
            DatabaseError::NotFound => 404,
            DatabaseError::Conflict(_) => 409,
            DatabaseError::BadDoc(_) => 400,
            DatabaseError::BadRev(_) => 400,
            DatabaseError::UnknownStore(_) => 400,
            DatabaseError::WriterStopped => 500,
            DatabaseError::Store(_) => 500,
        }
    }
}
