//! Event-stream feed
//!
//! Streams each change batch as a server-sent event: an `id:` line carrying
//! a hex timestamp (strictly monotonic per feed), a `data:` line with the
//! same JSON payload as the normal feed, and a blank line to terminate the
//! event. A heartbeat timer emits a bare newline on the same channel so
//! idle connections stay open through proxies.
//!
//! When the consumer drops the feed, the next frame send fails, the task
//! exits, and its bus registration is released with it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::database::Database;
use crate::observability::LogEvent;

use super::normal::{normal, ChangesPage};
use super::options::FeedOptions;

/// Keep-alive frame: a bare newline with no fields
pub const HEARTBEAT_FRAME: &str = "\n";

/// A running event-stream feed
#[derive(Debug)]
pub struct EventSourceFeed {
    frames: mpsc::UnboundedReceiver<String>,
}

impl EventSourceFeed {
    /// Await the next frame; `None` once the feed has shut down
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }
}

/// Subscribe an event-stream consumer to a database
pub fn eventsource(db: Arc<Database>, options: &FeedOptions) -> EventSourceFeed {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let since = options.since;
    let heartbeat = Duration::from_millis(options.heartbeat_ms.max(1));

    tokio::spawn(run(db, since, heartbeat, frames_tx));

    EventSourceFeed { frames: frames_rx }
}

async fn run(
    db: Arc<Database>,
    mut since: u64,
    heartbeat: Duration,
    frames: mpsc::UnboundedSender<String>,
) {
    let mut subscription = db.bus().reg();
    let mut ticker = time::interval_at(Instant::now() + heartbeat, heartbeat);
    let mut last_id: u64 = 0;

    LogEvent::trace("feed_subscribed").db(db.name()).emit();

    // Catch up before waiting for notifications
    if !fetch_and_emit(&db, &mut since, &mut last_id, &frames) {
        return;
    }

    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(_) => {
                        if !fetch_and_emit(&db, &mut since, &mut last_id, &frames) {
                            break;
                        }
                    }
                    // Bus gone: database is closing
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if frames.send(HEARTBEAT_FRAME.to_string()).is_err() {
                    break;
                }
            }
        }
    }

    LogEvent::trace("feed_unsubscribed").db(db.name()).emit();
}

/// Fetch changes after `since` and emit one event when non-empty
///
/// Returns false once the consumer is gone or the database failed.
fn fetch_and_emit(
    db: &Database,
    since: &mut u64,
    last_id: &mut u64,
    frames: &mpsc::UnboundedSender<String>,
) -> bool {
    let page = match normal(db, *since) {
        Ok(page) => page,
        Err(_) => {
            LogEvent::error("feed_fetch_failed").db(db.name()).emit();
            return false;
        }
    };
    if page.is_empty() {
        return true;
    }

    *since = page.last_seq;
    frames.send(event_frame(next_id(last_id), &page)).is_ok()
}

/// Timestamp-derived event id, bumped past the previous one when the clock
/// has not advanced
fn next_id(last_id: &mut u64) -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let id = now.max(*last_id + 1);
    *last_id = id;
    id
}

fn event_frame(id: u64, page: &ChangesPage) -> String {
    let data = serde_json::to_string(page).unwrap_or_else(|_| "{}".to_string());
    format!("id: {:x}\ndata: {}\n\n", id, data)
}
