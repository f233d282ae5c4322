//! Store subsystem for barrel
//!
//! The store presents an ordered key-value abstraction to the database and
//! its transactor: three logical namespaces per database (doc-info by id,
//! doc bodies by (id, rev), a by-sequence index), a side namespace for
//! system documents, and a small meta key holding the persisted sequence
//! high-water mark. Every commit is one atomic write batch.

mod engine;
mod errors;
mod keys;
mod memory;
mod store;

pub use engine::{BatchOp, KvEngine, ScanStep, WriteBatch};
pub use errors::{StoreError, StoreResult};
pub use keys::DbId;
pub use memory::MemoryEngine;
pub use store::{FoldOptions, OpenOptions, ReadOptions, Store};
