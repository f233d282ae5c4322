//! The single-writer task
//!
//! One transactor per database. Commands are processed strictly in arrival
//! order; a commit persists in one atomic batch and then notifies the
//! owning database with the assigned sequence number. Dropping every
//! handle, or an explicit stop, ends the task.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::database::{DatabaseError, DatabaseResult};
use crate::document::{DocId, DocInfo};
use crate::observability::LogEvent;
use crate::revision::RevId;
use crate::store::{DbId, Store};

use super::update::{UpdateFn, UpdateVerdict};

/// Notification from the transactor to its owning database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactorEvent {
    /// A write committed at this sequence number
    Updated {
        /// Sequence number assigned to the commit
        seq: u64,
    },
}

enum Command {
    Update {
        doc_id: DocId,
        update: UpdateFn,
        reply: oneshot::Sender<DatabaseResult<(DocId, RevId)>>,
    },
    WriteSystemDoc {
        doc_id: DocId,
        body: Box<Value>,
        reply: oneshot::Sender<DatabaseResult<()>>,
    },
    DeleteSystemDoc {
        doc_id: DocId,
        reply: oneshot::Sender<DatabaseResult<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running transactor
#[derive(Debug, Clone)]
pub struct TransactorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl TransactorHandle {
    /// Spawn a transactor bound to one database of one store
    ///
    /// `update_seq` seeds the sequence counter; on a respawn the caller
    /// passes the persisted high-water mark.
    pub fn spawn(
        store: Arc<Store>,
        db: DbId,
        update_seq: u64,
        events: mpsc::UnboundedSender<TransactorEvent>,
    ) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let transactor = Transactor {
            store,
            db,
            update_seq,
            events,
            inbox,
        };
        tokio::spawn(transactor.run());
        Self { commands }
    }

    /// True while the writer task is still accepting commands
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Submit an update; resolves once the write is durable (or rejected)
    pub async fn update(&self, doc_id: DocId, update: UpdateFn) -> DatabaseResult<(DocId, RevId)> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Update {
                doc_id,
                update,
                reply,
            })
            .map_err(|_| DatabaseError::WriterStopped)?;
        response.await.map_err(|_| DatabaseError::WriterStopped)?
    }

    /// Write a system document through the serialization point
    pub async fn write_system_doc(&self, doc_id: DocId, body: Value) -> DatabaseResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::WriteSystemDoc {
                doc_id,
                body: Box::new(body),
                reply,
            })
            .map_err(|_| DatabaseError::WriterStopped)?;
        response.await.map_err(|_| DatabaseError::WriterStopped)?
    }

    /// Delete a system document through the serialization point
    pub async fn delete_system_doc(&self, doc_id: DocId) -> DatabaseResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::DeleteSystemDoc { doc_id, reply })
            .map_err(|_| DatabaseError::WriterStopped)?;
        response.await.map_err(|_| DatabaseError::WriterStopped)?
    }

    /// Stop the writer after draining already-queued commands
    pub async fn stop(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Stop { reply }).is_ok() {
            let _ = response.await;
        }
    }
}

struct Transactor {
    store: Arc<Store>,
    db: DbId,
    update_seq: u64,
    events: mpsc::UnboundedSender<TransactorEvent>,
    inbox: mpsc::UnboundedReceiver<Command>,
}

impl Transactor {
    async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            match command {
                Command::Update {
                    doc_id,
                    update,
                    reply,
                } => {
                    let _ = reply.send(self.handle_update(doc_id, update));
                }
                Command::WriteSystemDoc {
                    doc_id,
                    body,
                    reply,
                } => {
                    let result = self
                        .store
                        .write_system_doc(&self.db, &doc_id, &body)
                        .map_err(DatabaseError::from);
                    let _ = reply.send(result);
                }
                Command::DeleteSystemDoc { doc_id, reply } => {
                    let result = self
                        .store
                        .delete_system_doc(&self.db, &doc_id)
                        .map_err(DatabaseError::from);
                    let _ = reply.send(result);
                }
                Command::Stop { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
        LogEvent::trace("transactor_stopped").db(&self.db).emit();
    }

    fn handle_update(
        &mut self,
        doc_id: DocId,
        update: UpdateFn,
    ) -> DatabaseResult<(DocId, RevId)> {
        let current = self.store.get_doc_info(&self.db, &doc_id)?;
        let prev_seq = current.as_ref().map(|info| info.update_seq);
        let info = current.unwrap_or_else(|| DocInfo::new(doc_id.clone()));

        match update(info)? {
            UpdateVerdict::Commit {
                mut info,
                rev,
                body,
            } => {
                let seq = self.update_seq + 1;
                info.update_seq = seq;
                self.store
                    .commit_update(&self.db, &info, &rev, &body, prev_seq)?;
                self.update_seq = seq;
                let _ = self.events.send(TransactorEvent::Updated { seq });
                LogEvent::trace("doc_committed")
                    .db(&self.db)
                    .doc(&doc_id)
                    .rev(&rev)
                    .seq(seq)
                    .emit();
                Ok((doc_id, rev))
            }
            UpdateVerdict::Unchanged { rev } => Ok((doc_id, rev)),
        }
    }
}
