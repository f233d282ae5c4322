//! Update functions
//!
//! The transactor runs an arbitrary update function against the current
//! DocInfo under serialization. The builders here produce the functions for
//! the normal write path (`put`, with delete and post layered on it by the
//! façade) and the replication path (`put_rev`).

use serde_json::Value;

use crate::database::{ConflictKind, DatabaseError, DatabaseResult};
use crate::document::{self, DocInfo, DocumentError};
use crate::revision::{RevId, RevInfo};

/// Outcome of an update function
#[derive(Debug)]
pub enum UpdateVerdict {
    /// Commit: persist the new DocInfo, store `body` under `rev`
    Commit {
        /// Metadata with the new revision grafted and the winner refreshed
        info: DocInfo,
        /// The newly written revision (not necessarily the winner)
        rev: RevId,
        /// Body to store at `rev`, `_rev` stripped
        body: Value,
    },
    /// Nothing to do; reply success without touching the store
    Unchanged {
        /// The revision the caller asked for, already present
        rev: RevId,
    },
}

/// An update function, run by the transactor against the current DocInfo
pub type UpdateFn = Box<dyn FnOnce(DocInfo) -> DatabaseResult<UpdateVerdict> + Send>;

/// Normal write path
///
/// With `lww` the write is accepted unconditionally on top of the current
/// winner. Otherwise a missing `_rev` is only accepted for a fresh document
/// or on top of a tombstone (resurrection), and a supplied `_rev` must name
/// a current leaf.
pub fn put_update(body: Value, lww: bool) -> UpdateFn {
    Box::new(move |mut info: DocInfo| {
        document::validate_object(&body).map_err(DatabaseError::BadDoc)?;
        let supplied = document::doc_rev(&body).map_err(DatabaseError::BadDoc)?;
        let supplied_gen = supplied.generation()?;
        let deleted = document::is_tombstone(&body);

        let (new_gen, parent) = if lww {
            if info.exists() {
                (info.current_rev.generation()? + 1, info.current_rev.clone())
            } else {
                (supplied_gen + 1, RevId::none())
            }
        } else if supplied.is_none() {
            if !info.exists() {
                (1, RevId::none())
            } else if info.deleted {
                // Resurrection: graft onto the winning tombstone
                (info.current_rev.generation()? + 1, info.current_rev.clone())
            } else {
                return Err(DatabaseError::Conflict(ConflictKind::DocExists));
            }
        } else {
            if !info.revtree.is_leaf(&supplied) {
                return Err(DatabaseError::Conflict(ConflictKind::RevisionConflict));
            }
            (supplied_gen + 1, supplied.clone())
        };

        let stored = document::without_rev(&body);
        let new_rev = RevId::mint(new_gen, &supplied, &document::canonical_json(&stored));

        info.revtree.add(RevInfo {
            id: new_rev.clone(),
            parent,
            deleted,
        });
        info.refresh_winner();

        Ok(UpdateVerdict::Commit {
            info,
            rev: new_rev,
            body: stored,
        })
    })
}

/// Replication write path
///
/// `history` is newest-first. The walk finds the first revision already in
/// the tree; everything newer is grafted on top of it as a proper chain,
/// each staged revision parented on its immediate older neighbor. Replaying
/// a history whose newest revision is already present is a no-op.
pub fn put_rev_update(body: Value, history: Vec<RevId>) -> UpdateFn {
    Box::new(move |mut info: DocInfo| {
        document::validate_object(&body).map_err(DatabaseError::BadDoc)?;
        if history.is_empty() {
            return Err(DatabaseError::BadDoc(DocumentError::EmptyHistory));
        }
        for rev in &history {
            rev.parse()?;
        }

        let newest = history[0].clone();
        if info.revtree.contains(&newest) {
            return Ok(UpdateVerdict::Unchanged { rev: newest });
        }

        // First known ancestor, or the whole history when none is known
        let (graft_len, graft_parent) = history
            .iter()
            .enumerate()
            .find(|(_, rev)| info.revtree.contains(rev))
            .map(|(idx, rev)| (idx, rev.clone()))
            .unwrap_or((history.len(), RevId::none()));

        let deleted = document::is_tombstone(&body);
        for idx in (0..graft_len).rev() {
            let parent = if idx + 1 == graft_len {
                graft_parent.clone()
            } else {
                history[idx + 1].clone()
            };
            info.revtree.add(RevInfo {
                id: history[idx].clone(),
                parent,
                deleted: idx == 0 && deleted,
            });
        }
        info.refresh_winner();

        Ok(UpdateVerdict::Commit {
            info,
            rev: newest,
            body: document::without_rev(&body),
        })
    })
}
