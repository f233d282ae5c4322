//! Database subsystem for barrel
//!
//! The per-database façade: reads go straight to the store, writes funnel
//! through the single-writer transactor, committed sequence numbers are
//! republished on the database's event bus. Also home to the revs-diff
//! primitive the replicator calls.

mod database;
mod errors;
mod revsdiff;

pub use database::{AllDocsPage, Database, DatabaseInfo, DatabaseOptions, PutOptions};
pub use errors::{ConflictKind, DatabaseError, DatabaseResult};
pub use revsdiff::{revs_diff, RevsDiff};
