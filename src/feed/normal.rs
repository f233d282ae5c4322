//! Normal feed
//!
//! One synchronous scan of the by-sequence index into a
//! `{last_seq, results}` page.

use serde::Serialize;

use crate::database::{Database, DatabaseResult};
use crate::document::DocInfo;
use crate::store::ScanStep;

/// One page of committed changes
#[derive(Debug, Clone, Serialize)]
pub struct ChangesPage {
    /// Highest sequence covered by this page; equals `since` when empty
    pub last_seq: u64,

    /// Doc-info snapshots in ascending sequence order, one per document
    pub results: Vec<DocInfo>,
}

impl ChangesPage {
    /// True when no changes were found
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Fetch everything committed after `since`
pub fn normal(db: &Database, since: u64) -> DatabaseResult<ChangesPage> {
    let mut last_seq = since;
    let mut results = Vec::new();

    db.changes_since(since, &mut |seq, info| {
        last_seq = seq;
        results.push(info);
        ScanStep::Continue
    })?;

    Ok(ChangesPage { last_seq, results })
}
