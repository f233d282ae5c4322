//! Observability subsystem for barrel
//!
//! Structured event logging only. Metrics counters and trace export are
//! the concern of outer layers.

mod logger;

pub use logger::{Level, LogEvent};
