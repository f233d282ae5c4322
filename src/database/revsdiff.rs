//! Revs-diff
//!
//! Given a set of revision ids a replicator holds, report which are missing
//! from the local tree and which known leaves could serve as ancestors for
//! fetching the gap.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::document::DocInfo;
use crate::revision::RevId;

/// Result of a revs-diff query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevsDiff {
    /// Input revisions not present in the tree, in input order
    pub missing: Vec<RevId>,

    /// Known revisions a replicator could fetch deltas against, sorted
    pub possible_ancestors: Vec<RevId>,
}

/// Compare the caller's revisions against a document's tree
///
/// An absent document makes every input revision missing with no
/// ancestors. For each missing revision, leaves that also appear in the
/// input set qualify: an older-generation leaf directly, an equal-
/// generation leaf through its parent.
pub fn revs_diff(info: Option<&DocInfo>, revs: &[RevId]) -> RevsDiff {
    let info = match info {
        Some(info) => info,
        None => {
            return RevsDiff {
                missing: revs.to_vec(),
                possible_ancestors: Vec::new(),
            }
        }
    };

    let missing: Vec<RevId> = revs
        .iter()
        .filter(|rev| !info.revtree.contains(rev))
        .cloned()
        .collect();

    let mut ancestors: BTreeSet<RevId> = BTreeSet::new();
    for rev in &missing {
        let missing_gen = match rev.parse() {
            Ok((gen, _)) => gen,
            Err(_) => continue,
        };

        info.revtree.fold_leafs((), |(), leaf| {
            if !revs.contains(&leaf.id) {
                return;
            }
            let leaf_gen = match leaf.id.parse() {
                Ok((gen, _)) => gen,
                Err(_) => return,
            };
            if leaf_gen < missing_gen {
                ancestors.insert(leaf.id.clone());
            } else if leaf_gen == missing_gen && !leaf.parent.is_none() {
                ancestors.insert(leaf.parent.clone());
            }
        });
    }

    RevsDiff {
        missing,
        possible_ancestors: ancestors.into_iter().collect(),
    }
}
