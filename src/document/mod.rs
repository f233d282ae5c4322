//! Document subsystem for barrel
//!
//! Body handling for the reserved `_id` / `_rev` / `_deleted` fields, the
//! canonical JSON form hashed into revision ids, and the `DocInfo` metadata
//! record the transactor maintains per document.

mod doc;
mod errors;
mod info;

pub use doc::{
    canonical_json, doc_id, doc_rev, is_tombstone, stamped, tombstone, validate_object,
    without_rev, DELETED_FIELD, ID_FIELD, REVISIONS_FIELD, REV_FIELD,
};
pub use errors::{DocumentError, DocumentResult};
pub use info::DocInfo;

/// Stable application-chosen identifier for a document
pub type DocId = String;
