//! Change-feed adapters for barrel
//!
//! Three views over the by-sequence index and the event bus: a synchronous
//! page (`normal`), a blocking fetch that waits for the first new commit
//! (`longpoll`), and a framed stream with heartbeats (`eventsource`). The
//! transport (HTTP, chunked encoding) is an external collaborator; these
//! adapters produce the payloads it forwards.

mod eventsource;
mod longpoll;
mod normal;
mod options;

pub use eventsource::{eventsource, EventSourceFeed, HEARTBEAT_FRAME};
pub use longpoll::longpoll;
pub use normal::{normal, ChangesPage};
pub use options::{FeedKind, FeedOptions, DEFAULT_HEARTBEAT_MS};
