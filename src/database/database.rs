//! The database façade
//!
//! One façade per open database. It owns the transactor handle and the
//! event bus, caches the update sequence, and exposes the read and write
//! surface callers use. Reads never touch the transactor; writes never
//! bypass it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bus::{DbEvent, EventBus};
use crate::document::{self, DocId, DocInfo, DocumentError};
use crate::observability::LogEvent;
use crate::revision::RevId;
use crate::store::{DbId, FoldOptions, OpenOptions, ReadOptions, ScanStep, Store};
use crate::transactor::{put_rev_update, put_update, TransactorEvent, TransactorHandle, UpdateFn};

use super::errors::{DatabaseError, DatabaseResult};
use super::revsdiff::{revs_diff, RevsDiff};

/// Options for opening a database
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    /// Create the database when the name is unknown
    pub create_if_missing: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
        }
    }
}

/// Options for `put`
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Last-writer-wins: accept unconditionally on top of the current winner
    pub lww: bool,
}

/// `_all_docs`-shaped result of a by-id fold
#[derive(Debug, Clone, Serialize)]
pub struct AllDocsPage {
    /// Number of rows returned (pagination is not implemented)
    pub total_rows: usize,

    /// Always zero (pagination is not implemented)
    pub offset: usize,

    /// Doc-info records in docid order
    pub rows: Vec<DocInfo>,
}

/// Database-level info snapshot
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    /// Database name
    pub db_name: String,

    /// Number of documents (tombstoned winners included)
    pub doc_count: usize,

    /// Highest assigned sequence number
    pub update_seq: u64,
}

/// An open database
#[derive(Debug)]
pub struct Database {
    name: String,
    db_id: DbId,
    store: Arc<Store>,
    writer: RwLock<TransactorHandle>,
    update_seq: Arc<AtomicU64>,
    bus: Arc<EventBus>,
}

impl Database {
    /// Open (and if allowed, create) a database on a store
    pub fn open(
        store: Arc<Store>,
        name: &str,
        options: &DatabaseOptions,
    ) -> DatabaseResult<Arc<Self>> {
        let (db_id, seq) = store.open_db(
            name,
            &OpenOptions {
                create_if_missing: options.create_if_missing,
            },
        )?;

        let bus = Arc::new(EventBus::new());
        let update_seq = Arc::new(AtomicU64::new(seq));
        let writer = Self::spawn_writer(&store, &db_id, seq, &bus, &update_seq);

        LogEvent::info("db_opened").db(name).seq(seq).emit();

        Ok(Arc::new(Self {
            name: name.to_string(),
            db_id,
            store,
            writer: RwLock::new(writer),
            update_seq,
            bus,
        }))
    }

    /// Spawn a transactor plus the task that forwards its notifications to
    /// the bus and the cached sequence counter
    fn spawn_writer(
        store: &Arc<Store>,
        db_id: &DbId,
        seq: u64,
        bus: &Arc<EventBus>,
        update_seq: &Arc<AtomicU64>,
    ) -> TransactorHandle {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let handle = TransactorHandle::spawn(Arc::clone(store), db_id.clone(), seq, events_tx);

        let bus = Arc::clone(bus);
        let update_seq = Arc::clone(update_seq);
        tokio::spawn(async move {
            while let Some(TransactorEvent::Updated { seq }) = events_rx.recv().await {
                update_seq.fetch_max(seq, Ordering::SeqCst);
                bus.notify(DbEvent::Updated { seq });
            }
        });

        handle
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached highest assigned sequence number
    pub fn update_seq(&self) -> u64 {
        self.update_seq.load(Ordering::SeqCst)
    }

    /// The database's notification bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // =========================================================================
    // Reads (store only)
    // =========================================================================

    /// Read a document body; the winning revision unless `rev` is given
    pub fn get(
        &self,
        docid: &str,
        rev: Option<&RevId>,
        options: &ReadOptions,
    ) -> DatabaseResult<Value> {
        Ok(self.store.get_doc(&self.db_id, docid, rev, options)?)
    }

    /// Read a document's metadata record
    pub fn get_doc_info(&self, docid: &str) -> DatabaseResult<Option<DocInfo>> {
        Ok(self.store.get_doc_info(&self.db_id, docid)?)
    }

    /// Iterate doc-info records in docid order
    pub fn fold_by_id(
        &self,
        options: &FoldOptions,
        visit: &mut dyn FnMut(DocInfo) -> ScanStep,
    ) -> DatabaseResult<()> {
        Ok(self.store.fold_by_id(&self.db_id, options, visit)?)
    }

    /// Fold doc-info records in docid order into an `_all_docs` page
    pub fn all_docs(&self, options: &FoldOptions) -> DatabaseResult<AllDocsPage> {
        let mut rows = Vec::new();
        self.fold_by_id(options, &mut |info| {
            rows.push(info);
            ScanStep::Continue
        })?;

        Ok(AllDocsPage {
            total_rows: rows.len(),
            offset: 0,
            rows,
        })
    }

    /// Iterate committed changes after `since`
    ///
    /// `since` is the last sequence the caller saw: a positive value
    /// resumes exclusively after it, zero starts from the beginning.
    pub fn changes_since(
        &self,
        since: u64,
        visit: &mut dyn FnMut(u64, DocInfo) -> ScanStep,
    ) -> DatabaseResult<()> {
        let start = if since > 0 { since.saturating_add(1) } else { 0 };
        Ok(self.store.changes_since(&self.db_id, start, visit)?)
    }

    /// Which of `revs` are unknown here, and what to fetch them against
    pub fn revsdiff(&self, docid: &str, revs: &[RevId]) -> DatabaseResult<RevsDiff> {
        let info = self.store.get_doc_info(&self.db_id, docid)?;
        Ok(revs_diff(info.as_ref(), revs))
    }

    /// Database-level info snapshot
    pub fn info(&self) -> DatabaseResult<DatabaseInfo> {
        let mut doc_count = 0;
        self.store
            .fold_by_id(&self.db_id, &FoldOptions::default(), &mut |_| {
                doc_count += 1;
                ScanStep::Continue
            })?;

        Ok(DatabaseInfo {
            db_name: self.name.clone(),
            doc_count,
            update_seq: self.update_seq(),
        })
    }

    /// Read a system document
    pub fn read_system_doc(&self, docid: &str) -> DatabaseResult<Option<Value>> {
        Ok(self.store.read_system_doc(&self.db_id, docid)?)
    }

    // =========================================================================
    // Writes (transactor only)
    // =========================================================================

    /// Write a document
    ///
    /// The body must carry `_id`. Without `_rev` this only succeeds for a
    /// fresh document or on top of a tombstone; with `_rev` the revision
    /// must be a current leaf.
    pub async fn put(&self, body: Value, options: &PutOptions) -> DatabaseResult<(DocId, RevId)> {
        document::validate_object(&body).map_err(DatabaseError::BadDoc)?;
        let docid = document::doc_id(&body)
            .map_err(DatabaseError::BadDoc)?
            .ok_or(DatabaseError::BadDoc(DocumentError::MissingId))?
            .to_string();

        let lww = options.lww;
        self.submit(docid, || put_update(body.clone(), lww)).await
    }

    /// Create a document, minting the id when the body has none
    ///
    /// Rejects bodies that carry `_rev`.
    pub async fn post(&self, body: Value) -> DatabaseResult<(DocId, RevId)> {
        document::validate_object(&body).map_err(DatabaseError::BadDoc)?;
        if !document::doc_rev(&body)
            .map_err(DatabaseError::BadDoc)?
            .is_none()
        {
            return Err(DatabaseError::BadDoc(DocumentError::UnexpectedRev));
        }

        let docid = match document::doc_id(&body).map_err(DatabaseError::BadDoc)? {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        let mut body = body;
        body[document::ID_FIELD] = Value::String(docid.clone());

        self.submit(docid, || put_update(body.clone(), false)).await
    }

    /// Delete a document revision (writes a tombstone)
    pub async fn delete(&self, docid: &str, rev: &RevId) -> DatabaseResult<(DocId, RevId)> {
        let body = document::tombstone(docid, rev);
        self.submit(docid.to_string(), || put_update(body.clone(), false))
            .await
    }

    /// Graft a replicated revision with its history (newest first)
    pub async fn put_rev(
        &self,
        body: Value,
        history: Vec<RevId>,
    ) -> DatabaseResult<(DocId, RevId)> {
        document::validate_object(&body).map_err(DatabaseError::BadDoc)?;
        let docid = document::doc_id(&body)
            .map_err(DatabaseError::BadDoc)?
            .ok_or(DatabaseError::BadDoc(DocumentError::MissingId))?
            .to_string();

        self.submit(docid, || put_rev_update(body.clone(), history.clone()))
            .await
    }

    /// Write a system document
    pub async fn write_system_doc(&self, docid: &str, body: Value) -> DatabaseResult<()> {
        let writer = self.writer()?;
        match writer.write_system_doc(docid.to_string(), body.clone()).await {
            Err(DatabaseError::WriterStopped) => {
                self.respawn_writer()?;
                self.writer()?.write_system_doc(docid.to_string(), body).await
            }
            other => other,
        }
    }

    /// Delete a system document
    pub async fn delete_system_doc(&self, docid: &str) -> DatabaseResult<()> {
        let writer = self.writer()?;
        match writer.delete_system_doc(docid.to_string()).await {
            Err(DatabaseError::WriterStopped) => {
                self.respawn_writer()?;
                self.writer()?.delete_system_doc(docid.to_string()).await
            }
            other => other,
        }
    }

    /// Stop the writer and delete every key the database owns
    pub async fn clean(&self) -> DatabaseResult<()> {
        self.writer()?.stop().await;
        self.store.clean_db(&self.name, &self.db_id)?;
        LogEvent::info("db_cleaned").db(&self.name).emit();
        Ok(())
    }

    // =========================================================================
    // Supervision
    // =========================================================================

    /// Submit a write, respawning the transactor once if it is gone
    ///
    /// An update function is consumed by the attempt, so the builder is
    /// re-invoked for the retry.
    async fn submit<F>(&self, docid: DocId, build: F) -> DatabaseResult<(DocId, RevId)>
    where
        F: Fn() -> UpdateFn,
    {
        for _ in 0..2 {
            let writer = self.writer()?;
            match writer.update(docid.clone(), build()).await {
                Err(DatabaseError::WriterStopped) => {
                    self.respawn_writer()?;
                }
                other => return other,
            }
        }
        Err(DatabaseError::WriterStopped)
    }

    fn writer(&self) -> DatabaseResult<TransactorHandle> {
        self.writer
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| DatabaseError::WriterStopped)
    }

    /// Reload the durable high-water mark and bind a fresh transactor
    ///
    /// In-flight writes at crash time are lost; persisted writes stay
    /// durable, so seeding from `last_update_seq` cannot reuse a sequence.
    fn respawn_writer(&self) -> DatabaseResult<()> {
        let seq = self.store.last_update_seq(&self.db_id)?;
        let handle = Self::spawn_writer(&self.store, &self.db_id, seq, &self.bus, &self.update_seq);

        let mut guard = self
            .writer
            .write()
            .map_err(|_| DatabaseError::WriterStopped)?;
        *guard = handle;
        self.update_seq.fetch_max(seq, Ordering::SeqCst);

        LogEvent::warn("transactor_respawned")
            .db(&self.name)
            .seq(seq)
            .emit();
        Ok(())
    }
}
