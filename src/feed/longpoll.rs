//! Long-poll feed
//!
//! Returns immediately when `changes_since(since)` already has rows.
//! Otherwise registers on the event bus and blocks until the first
//! `db_updated`, then fetches and returns. The bus registration is a guard
//! that unregisters on drop, so cancellation releases it too.

use crate::database::{Database, DatabaseResult};

use super::normal::{normal, ChangesPage};

/// Fetch changes after `since`, waiting for the first commit if none exist
pub async fn longpoll(db: &Database, since: u64) -> DatabaseResult<ChangesPage> {
    let page = normal(db, since)?;
    if !page.is_empty() {
        return Ok(page);
    }

    let mut subscription = db.bus().reg();

    // A write may have landed between the scan and the registration
    let page = normal(db, since)?;
    if !page.is_empty() {
        return Ok(page);
    }

    loop {
        match subscription.recv().await {
            Some(_) => {
                let page = normal(db, since)?;
                if !page.is_empty() {
                    return Ok(page);
                }
            }
            // Bus gone (database closing); report the current empty tail
            None => return normal(db, since),
        }
    }
}
