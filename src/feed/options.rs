//! Feed options
//!
//! The query parameters a feed consumes, parsed by the HTTP collaborator
//! and handed over here: `feed` (default normal), `since` (default 0) and
//! `heartbeat` in milliseconds (default 60000).

use std::str::FromStr;

/// Default heartbeat interval for event-stream consumers
pub const DEFAULT_HEARTBEAT_MS: u64 = 60_000;

/// Which feed view the caller asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedKind {
    /// One synchronous page
    #[default]
    Normal,
    /// Block until the first new commit
    Longpoll,
    /// Stream batches as server-sent events
    EventSource,
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(FeedKind::Normal),
            "longpoll" => Ok(FeedKind::Longpoll),
            "eventsource" => Ok(FeedKind::EventSource),
            other => Err(format!("unknown feed kind: {}", other)),
        }
    }
}

/// Options for a change feed
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Feed view
    pub kind: FeedKind,

    /// Last sequence the caller saw; 0 starts from the beginning
    pub since: u64,

    /// Keep-alive interval for event-stream consumers
    pub heartbeat_ms: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            kind: FeedKind::Normal,
            since: 0,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}
