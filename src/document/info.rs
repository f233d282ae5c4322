//! Document metadata records
//!
//! One `DocInfo` per document, mutated only by the owning transactor. It
//! carries the full revision tree plus the derived winner fields, and the
//! sequence number of the commit that last touched the document.

use serde::{Deserialize, Serialize};

use crate::document::DocId;
use crate::revision::{RevId, RevTree};

/// Per-document metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    /// Document id
    pub id: DocId,

    /// The winning revision; empty marker while the document has no revisions
    pub current_rev: RevId,

    /// More than one leaf exists
    #[serde(default)]
    pub branched: bool,

    /// More than one non-deleted leaf exists
    #[serde(default)]
    pub conflict: bool,

    /// Full revision tree
    #[serde(default)]
    pub revtree: RevTree,

    /// The winning revision is a tombstone
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,

    /// Sequence number of the commit that last touched this document
    #[serde(default)]
    pub update_seq: u64,
}

impl DocInfo {
    /// A fresh record for a document that does not exist yet
    pub fn new(id: impl Into<DocId>) -> Self {
        Self {
            id: id.into(),
            current_rev: RevId::none(),
            branched: false,
            conflict: false,
            revtree: RevTree::new(),
            deleted: false,
            update_seq: 0,
        }
    }

    /// True once at least one revision has been committed
    pub fn exists(&self) -> bool {
        !self.current_rev.is_none()
    }

    /// Recompute the winner fields from the revision tree
    pub fn refresh_winner(&mut self) {
        if let Some(winner) = self.revtree.winning_revision() {
            self.current_rev = winner.rev;
            self.branched = winner.branched;
            self.conflict = winner.conflict;
            self.deleted = winner.deleted;
        }
    }
}
