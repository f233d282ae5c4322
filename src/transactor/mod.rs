//! Transactor subsystem for barrel
//!
//! One single-writer task per database. Every mutation funnels through its
//! command channel and is processed strictly in arrival order: read the
//! current DocInfo, run the update function, assign the next sequence
//! number, commit one atomic batch, notify the owning database.

mod actor;
mod update;

pub use actor::{TransactorEvent, TransactorHandle};
pub use update::{
    put_rev_update, put_update, UpdateFn, UpdateVerdict,
};
