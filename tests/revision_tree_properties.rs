//! Revision-tree properties under real write traffic
//!
//! After any sequence of accepted writes: every current_rev is a winning
//! leaf, every non-root parent resolves, and leaf detection agrees with the
//! parent relation.

use std::sync::Arc;

use serde_json::json;

use barrel::database::{Database, DatabaseOptions, PutOptions};
use barrel::document::DocInfo;
use barrel::revision::RevId;
use barrel::store::{FoldOptions, Store};

fn open_db(name: &str) -> Arc<Database> {
    let store = Arc::new(Store::in_memory("default"));
    Database::open(store, name, &DatabaseOptions::default()).unwrap()
}

fn assert_tree_invariants(info: &DocInfo) {
    // current_rev is a leaf and the winner
    assert!(
        info.revtree.is_leaf(&info.current_rev),
        "current_rev {} of {} is not a leaf",
        info.current_rev,
        info.id
    );
    let winner = info.revtree.winning_revision().unwrap();
    assert_eq!(winner.rev, info.current_rev);
    assert_eq!(winner.branched, info.branched);
    assert_eq!(winner.conflict, info.conflict);

    for entry in info.revtree.iter() {
        // Every non-root parent resolves to an entry
        if !entry.parent.is_none() {
            assert!(
                info.revtree.contains(&entry.parent),
                "dangling parent {} in {}",
                entry.parent,
                info.id
            );
            // Generations strictly decrease toward the root
            let gen = entry.id.parse().unwrap().0;
            let parent_gen = entry.parent.parse().unwrap().0;
            assert!(parent_gen < gen);
        }

        // is_leaf agrees with the parent relation
        let named_as_parent = info.revtree.iter().any(|e| e.parent == entry.id);
        assert_eq!(info.revtree.is_leaf(&entry.id), !named_as_parent);
    }
}

fn all_infos(db: &Database) -> Vec<DocInfo> {
    db.all_docs(&FoldOptions::default()).unwrap().rows
}

/// Linear edits keep a single-leaf tree with intact parentage.
#[tokio::test]
async fn test_invariants_after_linear_edits() {
    let db = open_db("pets");

    let (id, mut rev) = db.post(json!({"n": 0})).await.unwrap();
    for n in 1..6 {
        let (_, next) = db
            .put(
                json!({"_id": id, "_rev": rev.as_str(), "n": n}),
                &PutOptions::default(),
            )
            .await
            .unwrap();
        rev = next;
    }

    let infos = all_infos(&db);
    assert_eq!(infos.len(), 1);
    assert_tree_invariants(&infos[0]);
    assert_eq!(infos[0].revtree.len(), 6);
    assert!(!infos[0].branched);
}

/// Replication grafts, tombstones, and revivals preserve the invariants on
/// every document they touch.
#[tokio::test]
async fn test_invariants_after_mixed_traffic() {
    let db = open_db("pets");

    // Linear doc with an edit
    let (a, rev_a) = db.post(json!({"kind": "a"})).await.unwrap();
    db.put(
        json!({"_id": a, "_rev": rev_a.as_str(), "kind": "a", "v": 2}),
        &PutOptions::default(),
    )
    .await
    .unwrap();

    // Grafted doc with a sibling branch
    db.put_rev(
        json!({"_id": "b", "v": 1}),
        vec![RevId::new("2-aa"), RevId::new("1-zz")],
    )
    .await
    .unwrap();
    db.put_rev(
        json!({"_id": "b", "v": 2}),
        vec![RevId::new("2-bb"), RevId::new("1-zz")],
    )
    .await
    .unwrap();

    // Deleted then revived doc
    let (c, rev_c) = db.post(json!({"kind": "c"})).await.unwrap();
    db.delete(&c, &rev_c).await.unwrap();
    db.put(json!({"_id": c, "back": true}), &PutOptions::default())
        .await
        .unwrap();

    // Last-writer-wins overwrite
    let (d, _) = db.post(json!({"kind": "d"})).await.unwrap();
    db.put(json!({"_id": d, "v": 2}), &PutOptions { lww: true })
        .await
        .unwrap();

    let infos = all_infos(&db);
    assert_eq!(infos.len(), 4);
    for info in &infos {
        assert_tree_invariants(info);
    }

    // The branched doc is the only conflicted one
    let branched = infos.iter().find(|i| i.id == "b").unwrap();
    assert!(branched.branched);
    assert!(branched.conflict);
    assert!(infos
        .iter()
        .filter(|i| i.id != "b")
        .all(|i| !i.conflict));
}

/// Minted revision ids parse back to the generation they were minted with.
#[tokio::test]
async fn test_minted_revisions_parse() {
    let db = open_db("pets");

    let (id, rev1) = db.post(json!({"v": 1})).await.unwrap();
    let (_, rev2) = db
        .put(
            json!({"_id": id, "_rev": rev1.as_str(), "v": 2}),
            &PutOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(rev1.parse().unwrap().0, 1);
    assert_eq!(rev2.parse().unwrap().0, 2);
}

/// The same edit on two replicas mints the same revision id.
#[tokio::test]
async fn test_minting_is_deterministic_across_replicas() {
    let left = open_db("left");
    let right = open_db("right");

    let (_, rev_l) = left
        .put(json!({"_id": "doc", "v": 1}), &PutOptions::default())
        .await
        .unwrap();
    let (_, rev_r) = right
        .put(json!({"_id": "doc", "v": 1}), &PutOptions::default())
        .await
        .unwrap();

    assert_eq!(rev_l, rev_r);
}
