//! Revision trees
//!
//! A revision tree maps revision ids to their entries. Generations strictly
//! increase from roots to leaves, which keeps the mapping acyclic without a
//! separate check. Entries are held in a `BTreeMap` so iteration (and
//! therefore leaf order and serialization) is deterministic for a given
//! tree.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::revid::RevId;

/// One entry of a revision tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevInfo {
    /// Revision id of this entry
    pub id: RevId,

    /// Parent revision id; the empty marker denotes a root
    pub parent: RevId,

    /// Whether this revision is a tombstone
    pub deleted: bool,
}

/// The winning revision of a tree, with the flags derived alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    /// The chosen revision id
    pub rev: RevId,
    /// More than one leaf exists
    pub branched: bool,
    /// More than one non-deleted leaf exists
    pub conflict: bool,
    /// The winner itself is a tombstone
    pub deleted: bool,
}

/// A document's revision tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevTree {
    entries: BTreeMap<RevId, RevInfo>,
}

impl RevTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the tree has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite an entry by id
    ///
    /// No parent-existence check happens here; callers staging a batch of
    /// grafted revisions add them in any order and are responsible for the
    /// parent invariant once the batch is complete.
    pub fn add(&mut self, info: RevInfo) {
        self.entries.insert(info.id.clone(), info);
    }

    /// True when `rev` is an entry of this tree
    pub fn contains(&self, rev: &RevId) -> bool {
        self.entries.contains_key(rev)
    }

    /// Look up an entry by revision id
    pub fn get(&self, rev: &RevId) -> Option<&RevInfo> {
        self.entries.get(rev)
    }

    /// Iterate all entries in revision-id order
    pub fn iter(&self) -> impl Iterator<Item = &RevInfo> {
        self.entries.values()
    }

    /// True iff `rev` is in the tree and no other entry names it as parent
    pub fn is_leaf(&self, rev: &RevId) -> bool {
        if !self.contains(rev) {
            return false;
        }
        !self.entries.values().any(|e| &e.parent == rev)
    }

    /// All leaves, in revision-id order
    pub fn leafs(&self) -> Vec<&RevInfo> {
        let parents: HashSet<&RevId> = self
            .entries
            .values()
            .filter(|e| !e.parent.is_none())
            .map(|e| &e.parent)
            .collect();

        self.entries
            .values()
            .filter(|e| !parents.contains(&e.id))
            .collect()
    }

    /// Fold over every leaf exactly once
    pub fn fold_leafs<A, F>(&self, acc: A, mut f: F) -> A
    where
        F: FnMut(A, &RevInfo) -> A,
    {
        let mut acc = acc;
        for leaf in self.leafs() {
            acc = f(acc, leaf);
        }
        acc
    }

    /// Select the winning revision
    ///
    /// Leaves are partitioned into live and deleted; the winner comes from
    /// the live pool when it is non-empty, otherwise from the deleted pool.
    /// Ties break on highest generation, then lexicographically largest
    /// hash. Returns `None` for an empty tree.
    pub fn winning_revision(&self) -> Option<Winner> {
        let leafs = self.leafs();
        if leafs.is_empty() {
            return None;
        }

        let (live, dead): (Vec<&RevInfo>, Vec<&RevInfo>) =
            leafs.iter().copied().partition(|l| !l.deleted);

        let pool = if live.is_empty() { &dead } else { &live };
        let winner = pool.iter().max_by_key(|l| rank(&l.id))?;

        Some(Winner {
            rev: winner.id.clone(),
            branched: leafs.len() > 1,
            conflict: live.len() > 1,
            deleted: winner.deleted,
        })
    }

    /// Walk from `from` toward the root
    ///
    /// Collects at most `max` revision ids, starting at `from` itself.
    /// Stops after collecting an entry listed in `stop_at` (the caller
    /// already has everything older).
    pub fn walk(&self, from: &RevId, max: usize, stop_at: &[RevId]) -> Vec<RevId> {
        let mut path = Vec::new();
        let mut cursor = self.get(from);

        while let Some(info) = cursor {
            path.push(info.id.clone());
            if path.len() >= max || stop_at.contains(&info.id) || info.parent.is_none() {
                break;
            }
            cursor = self.get(&info.parent);
        }

        path
    }
}

/// Tie-break key: generation first, hash second
///
/// Entries that fail to parse rank below every well-formed revision.
fn rank(rev: &RevId) -> (u64, String) {
    match rev.parse() {
        Ok((gen, hash)) => (gen, hash.to_string()),
        Err(_) => (0, rev.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, parent: &str, deleted: bool) -> RevInfo {
        RevInfo {
            id: RevId::new(id),
            parent: if parent.is_empty() {
                RevId::none()
            } else {
                RevId::new(parent)
            },
            deleted,
        }
    }

    fn linear_tree() -> RevTree {
        let mut tree = RevTree::new();
        tree.add(entry("1-a", "", false));
        tree.add(entry("2-b", "1-a", false));
        tree.add(entry("3-c", "2-b", false));
        tree
    }

    #[test]
    fn test_add_and_contains() {
        let tree = linear_tree();
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(&RevId::new("2-b")));
        assert!(!tree.contains(&RevId::new("2-x")));
    }

    #[test]
    fn test_leaf_detection() {
        let tree = linear_tree();
        assert!(tree.is_leaf(&RevId::new("3-c")));
        assert!(!tree.is_leaf(&RevId::new("2-b")));
        assert!(!tree.is_leaf(&RevId::new("9-missing")));
    }

    #[test]
    fn test_every_parent_exists() {
        let tree = linear_tree();
        for info in tree.iter() {
            if !info.parent.is_none() {
                assert!(tree.contains(&info.parent));
            }
        }
    }

    #[test]
    fn test_fold_leafs_visits_each_leaf_once() {
        let mut tree = linear_tree();
        tree.add(entry("3-d", "2-b", false));

        let seen = tree.fold_leafs(Vec::new(), |mut acc, leaf| {
            acc.push(leaf.id.clone());
            acc
        });

        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&RevId::new("3-c")));
        assert!(seen.contains(&RevId::new("3-d")));
    }

    #[test]
    fn test_winning_revision_linear() {
        let winner = linear_tree().winning_revision().unwrap();
        assert_eq!(winner.rev, RevId::new("3-c"));
        assert!(!winner.branched);
        assert!(!winner.conflict);
        assert!(!winner.deleted);
    }

    #[test]
    fn test_winning_revision_empty_tree() {
        assert!(RevTree::new().winning_revision().is_none());
    }

    #[test]
    fn test_winner_prefers_higher_generation() {
        let mut tree = RevTree::new();
        tree.add(entry("1-a", "", false));
        tree.add(entry("2-b", "1-a", false));
        tree.add(entry("3-c", "2-b", false));
        tree.add(entry("2-z", "1-a", false));

        let winner = tree.winning_revision().unwrap();
        assert_eq!(winner.rev, RevId::new("3-c"));
        assert!(winner.branched);
        assert!(winner.conflict);
    }

    #[test]
    fn test_winner_ties_break_on_hash() {
        let mut tree = RevTree::new();
        tree.add(entry("1-a", "", false));
        tree.add(entry("2-x", "1-a", false));
        tree.add(entry("2-y", "1-a", false));

        let winner = tree.winning_revision().unwrap();
        assert_eq!(winner.rev, RevId::new("2-y"));
        assert!(winner.branched);
        assert!(winner.conflict);
    }

    #[test]
    fn test_winner_prefers_live_over_deleted() {
        let mut tree = RevTree::new();
        tree.add(entry("1-a", "", false));
        tree.add(entry("2-b", "1-a", false));
        tree.add(entry("3-c", "2-b", true));
        tree.add(entry("2-a", "1-a", false));

        // 3-c has the highest generation but is a tombstone
        let winner = tree.winning_revision().unwrap();
        assert_eq!(winner.rev, RevId::new("2-a"));
        assert!(winner.branched);
        assert!(!winner.conflict);
        assert!(!winner.deleted);
    }

    #[test]
    fn test_all_leaves_deleted_picks_among_tombstones() {
        let mut tree = RevTree::new();
        tree.add(entry("1-a", "", false));
        tree.add(entry("2-b", "1-a", true));

        let winner = tree.winning_revision().unwrap();
        assert_eq!(winner.rev, RevId::new("2-b"));
        assert!(winner.deleted);
        assert!(!winner.conflict);
    }

    #[test]
    fn test_walk_to_root() {
        let tree = linear_tree();
        let path = tree.walk(&RevId::new("3-c"), usize::MAX, &[]);
        assert_eq!(
            path,
            vec![RevId::new("3-c"), RevId::new("2-b"), RevId::new("1-a")]
        );
    }

    #[test]
    fn test_walk_respects_cap() {
        let tree = linear_tree();
        let path = tree.walk(&RevId::new("3-c"), 2, &[]);
        assert_eq!(path, vec![RevId::new("3-c"), RevId::new("2-b")]);
    }

    #[test]
    fn test_walk_stops_at_known_ancestor() {
        let tree = linear_tree();
        let path = tree.walk(&RevId::new("3-c"), usize::MAX, &[RevId::new("2-b")]);
        assert_eq!(path, vec![RevId::new("3-c"), RevId::new("2-b")]);
    }

    #[test]
    fn test_walk_from_unknown_revision_is_empty() {
        let tree = linear_tree();
        assert!(tree.walk(&RevId::new("9-zz"), usize::MAX, &[]).is_empty());
    }

    #[test]
    fn test_add_overwrites_by_id() {
        let mut tree = linear_tree();
        tree.add(entry("3-c", "2-b", true));
        assert_eq!(tree.len(), 3);
        assert!(tree.get(&RevId::new("3-c")).unwrap().deleted);
    }
}
