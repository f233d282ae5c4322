//! Event log lines for barrel
//!
//! One JSON line per event, written synchronously and unbuffered. An event
//! is assembled through typed accessors for the vocabulary the subsystems
//! share (database, store, document, revision, sequence number) and
//! rendered with `serde_json`; its object maps are key-sorted, so the same
//! event always produces the same line.

use std::io::{self, Write};

use serde_json::{Map, Value};

use crate::revision::RevId;

/// How noteworthy an event is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Per-operation detail
    Trace,
    /// Lifecycle events
    Info,
    /// Recovered problems
    Warn,
    /// Failures; routed to stderr
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// A structured log event under construction
///
/// Writing never fails the caller: a database does not go down because
/// stdout did.
#[derive(Debug)]
pub struct LogEvent {
    level: Level,
    fields: Map<String, Value>,
}

impl LogEvent {
    fn new(level: Level, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("event".to_string(), Value::String(name.to_string()));
        fields.insert(
            "level".to_string(),
            Value::String(level.as_str().to_string()),
        );
        Self { level, fields }
    }

    /// Start a per-operation detail event
    pub fn trace(name: &str) -> Self {
        Self::new(Level::Trace, name)
    }

    /// Start a lifecycle event
    pub fn info(name: &str) -> Self {
        Self::new(Level::Info, name)
    }

    /// Start an event for a recovered problem
    pub fn warn(name: &str) -> Self {
        Self::new(Level::Warn, name)
    }

    /// Start a failure event
    pub fn error(name: &str) -> Self {
        Self::new(Level::Error, name)
    }

    /// Database the event concerns
    pub fn db(self, name: &str) -> Self {
        self.with("db", Value::String(name.to_string()))
    }

    /// Store the event concerns
    pub fn store(self, name: &str) -> Self {
        self.with("store", Value::String(name.to_string()))
    }

    /// Document the event concerns
    pub fn doc(self, id: &str) -> Self {
        self.with("doc", Value::String(id.to_string()))
    }

    /// Revision the event concerns
    pub fn rev(self, rev: &RevId) -> Self {
        self.with("rev", Value::String(rev.as_str().to_string()))
    }

    /// Sequence number assigned to a commit
    pub fn seq(self, seq: u64) -> Self {
        self.with("seq", Value::from(seq))
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// The event as a JSON value, keys sorted
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Write the event as one line: errors to stderr, the rest to stdout
    pub fn emit(self) {
        let line = self.to_json().to_string();
        match self.level {
            Level::Error => {
                let mut sink = io::stderr();
                let _ = writeln!(sink, "{}", line);
                let _ = sink.flush();
            }
            _ => {
                let mut sink = io::stdout();
                let _ = writeln!(sink, "{}", line);
                let _ = sink.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_carries_name_and_level() {
        let json = LogEvent::info("db_opened").db("pets").seq(3).to_json();
        assert_eq!(json["event"], "db_opened");
        assert_eq!(json["level"], "info");
        assert_eq!(json["db"], "pets");
        assert_eq!(json["seq"], 3);
    }

    #[test]
    fn test_seq_stays_numeric() {
        let line = LogEvent::trace("doc_committed").seq(42).to_json().to_string();
        assert!(line.contains("\"seq\":42"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = LogEvent::warn("transactor_respawned")
            .seq(7)
            .db("pets")
            .to_json()
            .to_string();
        let b = LogEvent::warn("transactor_respawned")
            .db("pets")
            .seq(7)
            .to_json()
            .to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn test_special_characters_stay_valid_json() {
        let line = LogEvent::info("db_opened")
            .db("a\"b\\c\nd")
            .to_json()
            .to_string();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["db"], "a\"b\\c\nd");
    }

    #[test]
    fn test_doc_and_rev_accessors() {
        let json = LogEvent::trace("doc_committed")
            .doc("cat")
            .rev(&RevId::new("1-ab"))
            .to_json();
        assert_eq!(json["doc"], "cat");
        assert_eq!(json["rev"], "1-ab");
    }

    #[test]
    fn test_level_rendering() {
        assert_eq!(LogEvent::trace("e").to_json()["level"], "trace");
        assert_eq!(LogEvent::error("e").to_json()["level"], "error");
    }
}
