//! Per-database event bus
//!
//! Fan-out of `db_updated` notifications to registered subscribers. Each
//! subscriber owns a mailbox; delivery is best-effort, at-least-once, and
//! ordered per subscriber. Events carry no payload beyond the sequence
//! number: receivers call back into `changes_since` for the actual delta.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use uuid::Uuid;

/// A database notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEvent {
    /// A write committed at this sequence number
    Updated {
        /// Sequence number assigned to the commit
        seq: u64,
    },
}

/// Per-database pub-sub channel
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<Uuid, mpsc::UnboundedSender<DbEvent>>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the calling consumer
    ///
    /// The returned subscription unregisters itself on drop.
    pub fn reg(self: &Arc<Self>) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(mut subs) = self.subscribers.write() {
            subs.insert(id, tx);
        }

        Subscription {
            id,
            bus: Arc::clone(self),
            events: rx,
        }
    }

    /// Remove a subscriber by token
    pub fn unreg(&self, id: Uuid) {
        if let Ok(mut subs) = self.subscribers.write() {
            subs.remove(&id);
        }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Subscribers whose mailbox has closed are pruned.
    pub fn notify(&self, event: DbEvent) {
        let dead: Vec<Uuid> = {
            let subs = match self.subscribers.read() {
                Ok(subs) => subs,
                Err(_) => return,
            };
            subs.iter()
                .filter(|(_, tx)| tx.send(event).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            if let Ok(mut subs) = self.subscribers.write() {
                for id in dead {
                    subs.remove(&id);
                }
            }
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// A live bus registration with its mailbox
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    bus: Arc<EventBus>,
    events: mpsc::UnboundedReceiver<DbEvent>,
}

impl Subscription {
    /// Await the next event; `None` once unregistered and drained
    pub async fn recv(&mut self) -> Option<DbEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unreg(self.id);
    }
}
