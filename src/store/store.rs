//! The store contract
//!
//! Everything the database façade and the transactor need from persistence:
//! database open/clean, document and doc-info reads, the by-id and
//! by-sequence folds, the atomic commit batch, and system-doc side storage.
//! A store is one engine shared by many databases, each behind its own key
//! prefix.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::document::{self, DocInfo};
use crate::revision::RevId;

use super::engine::{KvEngine, ScanStep, WriteBatch};
use super::errors::{StoreError, StoreResult};
use super::keys::{self, DbId};
use super::memory::MemoryEngine;

/// Default cap on `_revisions` history length
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Options for `open_db`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Create the database when the name is unknown
    pub create_if_missing: bool,
}

/// Options for `get_doc`
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Attach `_revisions: {start, ids}` to the body
    pub history: bool,

    /// Cap on the length of the attached history
    pub max_history: usize,

    /// Revisions the caller already has; the walk stops after hitting one
    pub ancestors: Vec<RevId>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            history: false,
            max_history: DEFAULT_HISTORY_LIMIT,
            ancestors: Vec::new(),
        }
    }
}

/// Options for `fold_by_id`
#[derive(Debug, Clone, Default)]
pub struct FoldOptions {
    /// First docid to visit (inclusive)
    pub start_key: Option<String>,

    /// Last docid to visit (inclusive)
    pub end_key: Option<String>,

    /// Cap on the number of rows visited
    pub max: Option<usize>,
}

/// A named store: one ordered KV engine hosting many databases
#[derive(Debug)]
pub struct Store {
    name: String,
    engine: Arc<dyn KvEngine>,
}

impl Store {
    /// Open a store backed by the in-memory engine
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::with_engine(name, Arc::new(MemoryEngine::new()))
    }

    /// Open a store over an arbitrary engine
    pub fn with_engine(name: impl Into<String>, engine: Arc<dyn KvEngine>) -> Self {
        Self {
            name: name.into(),
            engine,
        }
    }

    /// Store name as declared in configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a database by name
    ///
    /// Returns the DbId and the persisted update-seq high-water mark.
    pub fn open_db(&self, name: &str, options: &OpenOptions) -> StoreResult<(DbId, u64)> {
        let catalog = keys::catalog_key(name);

        if let Some(bytes) = self.engine.get(&catalog)? {
            let db = String::from_utf8(bytes)
                .map_err(|_| StoreError::Corrupt(format!("catalog entry for {}", name)))?;
            let seq = self.last_update_seq(&db)?;
            return Ok((db, seq));
        }

        if !options.create_if_missing {
            return Err(StoreError::DbNotFound(name.to_string()));
        }

        let db = Uuid::new_v4().simple().to_string();
        let mut batch = WriteBatch::new();
        batch.put(catalog, db.clone().into_bytes());
        batch.put(keys::meta_seq_key(&db), 0u64.to_be_bytes().to_vec());
        self.engine.write(batch)?;

        Ok((db, 0))
    }

    /// Persisted update-seq high-water mark; 0 for an empty database
    pub fn last_update_seq(&self, db: &DbId) -> StoreResult<u64> {
        match self.engine.get(&keys::meta_seq_key(db))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Corrupt("update_seq".to_string()))?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Read one document's metadata record
    pub fn get_doc_info(&self, db: &DbId, docid: &str) -> StoreResult<Option<DocInfo>> {
        match self.engine.get(&keys::doc_info_key(db, docid))? {
            Some(bytes) => Ok(Some(decode_info(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read a document body
    ///
    /// Without an explicit revision the winning revision is returned, and a
    /// deleted winner reads as `NotFound`. With an explicit revision the
    /// stored body for that revision is returned even for tombstones.
    pub fn get_doc(
        &self,
        db: &DbId,
        docid: &str,
        rev: Option<&RevId>,
        options: &ReadOptions,
    ) -> StoreResult<Value> {
        let info = self
            .get_doc_info(db, docid)?
            .ok_or(StoreError::NotFound)?;

        let rev = match rev {
            Some(rev) => rev.clone(),
            None => {
                if info.deleted {
                    return Err(StoreError::NotFound);
                }
                info.current_rev.clone()
            }
        };

        let bytes = self
            .engine
            .get(&keys::doc_body_key(db, docid, &rev))?
            .ok_or(StoreError::NotFound)?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("body of {}: {}", docid, e)))?;

        let mut body = document::stamped(&body, docid, &rev);

        if options.history {
            let path = info.revtree.walk(&rev, options.max_history, &options.ancestors);
            if !path.is_empty() {
                body[document::REVISIONS_FIELD] = revisions_field(&path);
            }
        }

        Ok(body)
    }

    /// Commit one accepted update atomically
    ///
    /// Persists the DocInfo, the body at `rev`, the fresh by-seq snapshot,
    /// the removal of the document's previous by-seq row, and the new
    /// high-water mark, all in a single batch.
    pub fn commit_update(
        &self,
        db: &DbId,
        info: &DocInfo,
        rev: &RevId,
        body: &Value,
        prev_seq: Option<u64>,
    ) -> StoreResult<()> {
        let encoded_info = encode_info(info)?;

        let mut batch = WriteBatch::new();
        batch.put(keys::doc_info_key(db, &info.id), encoded_info.clone());
        batch.put(
            keys::doc_body_key(db, &info.id, rev),
            serde_json::to_vec(body)
                .map_err(|e| StoreError::Corrupt(format!("body of {}: {}", info.id, e)))?,
        );
        batch.put(keys::by_seq_key(db, info.update_seq), encoded_info);
        if let Some(prev) = prev_seq {
            batch.delete(keys::by_seq_key(db, prev));
        }
        batch.put(
            keys::meta_seq_key(db),
            info.update_seq.to_be_bytes().to_vec(),
        );

        self.engine.write(batch)
    }

    /// Iterate doc-info records in docid order
    pub fn fold_by_id(
        &self,
        db: &DbId,
        options: &FoldOptions,
        visit: &mut dyn FnMut(DocInfo) -> ScanStep,
    ) -> StoreResult<()> {
        let from = match &options.start_key {
            Some(start) => keys::doc_info_key(db, start),
            None => keys::doc_info_prefix(db),
        };
        let to = match &options.end_key {
            Some(end) => Some(keys::after_key(&keys::doc_info_key(db, end))),
            None => keys::prefix_end(&keys::doc_info_prefix(db)),
        };

        let max = options.max.unwrap_or(usize::MAX);
        let mut remaining = max;
        let mut decode_failure: Option<StoreError> = None;

        self.engine.scan(&from, to.as_deref(), &mut |_, value| {
            if remaining == 0 {
                return ScanStep::Stop;
            }
            match decode_info(value) {
                Ok(info) => {
                    remaining -= 1;
                    visit(info)
                }
                Err(e) => {
                    decode_failure = Some(e);
                    ScanStep::Stop
                }
            }
        })?;

        match decode_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Iterate by-seq entries with `seq >= since` in ascending order
    pub fn changes_since(
        &self,
        db: &DbId,
        since: u64,
        visit: &mut dyn FnMut(u64, DocInfo) -> ScanStep,
    ) -> StoreResult<()> {
        let from = keys::by_seq_key(db, since);
        let to = keys::prefix_end(&keys::by_seq_prefix(db));
        let mut decode_failure: Option<StoreError> = None;

        self.engine.scan(&from, to.as_deref(), &mut |_, value| {
            match decode_info(value) {
                Ok(info) => visit(info.update_seq, info),
                Err(e) => {
                    decode_failure = Some(e);
                    ScanStep::Stop
                }
            }
        })?;

        match decode_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete a database: its catalog entry and every key it owns
    pub fn clean_db(&self, name: &str, db: &DbId) -> StoreResult<()> {
        let prefix = keys::db_prefix(db);
        let to = keys::prefix_end(&prefix);

        let mut batch = WriteBatch::new();
        batch.delete(keys::catalog_key(name));
        self.engine.scan(&prefix, to.as_deref(), &mut |key, _| {
            batch.delete(key.to_vec());
            ScanStep::Continue
        })?;

        self.engine.write(batch)
    }

    /// Write a system document (side storage, no revision machinery)
    pub fn write_system_doc(&self, db: &DbId, docid: &str, body: &Value) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(
            keys::system_doc_key(db, docid),
            serde_json::to_vec(body)
                .map_err(|e| StoreError::Corrupt(format!("system doc {}: {}", docid, e)))?,
        );
        self.engine.write(batch)
    }

    /// Read a system document
    pub fn read_system_doc(&self, db: &DbId, docid: &str) -> StoreResult<Option<Value>> {
        match self.engine.get(&keys::system_doc_key(db, docid))? {
            Some(bytes) => {
                let body = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(format!("system doc {}: {}", docid, e)))?;
                Ok(Some(body))
            }
            None => Ok(None),
        }
    }

    /// Delete a system document
    pub fn delete_system_doc(&self, db: &DbId, docid: &str) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(keys::system_doc_key(db, docid));
        self.engine.write(batch)
    }
}

fn encode_info(info: &DocInfo) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(info)
        .map_err(|e| StoreError::Corrupt(format!("doc info {}: {}", info.id, e)))
}

fn decode_info(bytes: &[u8]) -> StoreResult<DocInfo> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(format!("doc info: {}", e)))
}

/// `_revisions: {start, ids}`: current hash first, ancestors toward root
fn revisions_field(path: &[RevId]) -> Value {
    let start = path
        .first()
        .and_then(|rev| rev.parse().ok())
        .map(|(gen, _)| gen)
        .unwrap_or(0);
    let ids: Vec<String> = path
        .iter()
        .map(|rev| match rev.parse() {
            Ok((_, hash)) => hash.to_string(),
            Err(_) => rev.as_str().to_string(),
        })
        .collect();
    serde_json::json!({ "start": start, "ids": ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::RevInfo;
    use serde_json::json;

    fn create() -> OpenOptions {
        OpenOptions {
            create_if_missing: true,
        }
    }

    fn committed_info(docid: &str, rev: &str, seq: u64) -> DocInfo {
        let mut info = DocInfo::new(docid);
        info.revtree.add(RevInfo {
            id: RevId::new(rev),
            parent: RevId::none(),
            deleted: false,
        });
        info.refresh_winner();
        info.update_seq = seq;
        info
    }

    #[test]
    fn test_open_db_requires_create_flag() {
        let store = Store::in_memory("default");
        let missing = store.open_db("pets", &OpenOptions::default());
        assert!(matches!(missing, Err(StoreError::DbNotFound(_))));

        let (db, seq) = store.open_db("pets", &create()).unwrap();
        assert_eq!(seq, 0);

        // Reopening yields the same DbId
        let (again, _) = store.open_db("pets", &OpenOptions::default()).unwrap();
        assert_eq!(db, again);
    }

    #[test]
    fn test_commit_then_read_back() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        let info = committed_info("cat", "1-aa", 1);
        store
            .commit_update(&db, &info, &RevId::new("1-aa"), &json!({"name": "tom"}), None)
            .unwrap();

        let body = store.get_doc(&db, "cat", None, &ReadOptions::default()).unwrap();
        assert_eq!(body["_id"], "cat");
        assert_eq!(body["_rev"], "1-aa");
        assert_eq!(body["name"], "tom");
        assert_eq!(store.last_update_seq(&db).unwrap(), 1);
    }

    #[test]
    fn test_missing_doc_and_missing_rev() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        assert!(matches!(
            store.get_doc(&db, "nope", None, &ReadOptions::default()),
            Err(StoreError::NotFound)
        ));

        let info = committed_info("cat", "1-aa", 1);
        store
            .commit_update(&db, &info, &RevId::new("1-aa"), &json!({}), None)
            .unwrap();
        assert!(matches!(
            store.get_doc(&db, "cat", Some(&RevId::new("9-zz")), &ReadOptions::default()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_by_seq_keeps_one_row_per_doc() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        let first = committed_info("cat", "1-aa", 1);
        store
            .commit_update(&db, &first, &RevId::new("1-aa"), &json!({"v": 1}), None)
            .unwrap();

        let mut second = first.clone();
        second.revtree.add(RevInfo {
            id: RevId::new("2-bb"),
            parent: RevId::new("1-aa"),
            deleted: false,
        });
        second.refresh_winner();
        second.update_seq = 2;
        store
            .commit_update(&db, &second, &RevId::new("2-bb"), &json!({"v": 2}), Some(1))
            .unwrap();

        let mut rows = Vec::new();
        store
            .changes_since(&db, 0, &mut |seq, info| {
                rows.push((seq, info.id));
                ScanStep::Continue
            })
            .unwrap();

        assert_eq!(rows, vec![(2, "cat".to_string())]);
    }

    #[test]
    fn test_changes_since_is_inclusive_lower_bound() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        for (docid, seq) in [("a", 1), ("b", 2), ("c", 3)] {
            let info = committed_info(docid, "1-aa", seq);
            store
                .commit_update(&db, &info, &RevId::new("1-aa"), &json!({}), None)
                .unwrap();
        }

        let mut seqs = Vec::new();
        store
            .changes_since(&db, 2, &mut |seq, _| {
                seqs.push(seq);
                ScanStep::Continue
            })
            .unwrap();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn test_fold_by_id_bounds_and_cap() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        for (docid, seq) in [("ant", 1), ("bee", 2), ("cat", 3), ("dog", 4)] {
            let info = committed_info(docid, "1-aa", seq);
            store
                .commit_update(&db, &info, &RevId::new("1-aa"), &json!({}), None)
                .unwrap();
        }

        let mut ids = Vec::new();
        store
            .fold_by_id(
                &db,
                &FoldOptions {
                    start_key: Some("bee".to_string()),
                    end_key: Some("cat".to_string()),
                    max: None,
                },
                &mut |info| {
                    ids.push(info.id);
                    ScanStep::Continue
                },
            )
            .unwrap();
        assert_eq!(ids, vec!["bee".to_string(), "cat".to_string()]);

        let mut capped = Vec::new();
        store
            .fold_by_id(
                &db,
                &FoldOptions {
                    max: Some(2),
                    ..FoldOptions::default()
                },
                &mut |info| {
                    capped.push(info.id);
                    ScanStep::Continue
                },
            )
            .unwrap();
        assert_eq!(capped, vec!["ant".to_string(), "bee".to_string()]);
    }

    #[test]
    fn test_history_attachment() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        let mut info = DocInfo::new("cat");
        for (id, parent) in [("1-aa", ""), ("2-bb", "1-aa"), ("3-cc", "2-bb")] {
            info.revtree.add(RevInfo {
                id: RevId::new(id),
                parent: if parent.is_empty() {
                    RevId::none()
                } else {
                    RevId::new(parent)
                },
                deleted: false,
            });
        }
        info.refresh_winner();
        info.update_seq = 1;
        store
            .commit_update(&db, &info, &RevId::new("3-cc"), &json!({"v": 3}), None)
            .unwrap();

        let body = store
            .get_doc(
                &db,
                "cat",
                None,
                &ReadOptions {
                    history: true,
                    ..ReadOptions::default()
                },
            )
            .unwrap();
        assert_eq!(body["_revisions"]["start"], 3);
        assert_eq!(body["_revisions"]["ids"], json!(["cc", "bb", "aa"]));
    }

    #[test]
    fn test_system_docs_round_trip() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        store
            .write_system_doc(&db, "_security", &json!({"admins": []}))
            .unwrap();
        assert_eq!(
            store.read_system_doc(&db, "_security").unwrap(),
            Some(json!({"admins": []}))
        );

        store.delete_system_doc(&db, "_security").unwrap();
        assert_eq!(store.read_system_doc(&db, "_security").unwrap(), None);
    }

    #[test]
    fn test_clean_db_removes_everything() {
        let store = Store::in_memory("default");
        let (db, _) = store.open_db("pets", &create()).unwrap();

        let info = committed_info("cat", "1-aa", 1);
        store
            .commit_update(&db, &info, &RevId::new("1-aa"), &json!({}), None)
            .unwrap();
        store.write_system_doc(&db, "cfg", &json!({})).unwrap();

        store.clean_db("pets", &db).unwrap();

        assert!(matches!(
            store.open_db("pets", &OpenOptions::default()),
            Err(StoreError::DbNotFound(_))
        ));
        assert_eq!(store.last_update_seq(&db).unwrap(), 0);
        assert!(store.get_doc_info(&db, "cat").unwrap().is_none());
        assert!(store.read_system_doc(&db, "cfg").unwrap().is_none());
    }
}
