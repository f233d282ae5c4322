//! Keyspace layout
//!
//! Every database owns a key prefix derived from its DbId. Within it:
//!
//! | key                      | value                       |
//! |--------------------------|-----------------------------|
//! | `<db>/D\|<docid>`        | DocInfo (JSON)              |
//! | `<db>/B\|<docid>\|<rev>` | body bytes                  |
//! | `<db>/S\|<be64 seq>`     | DocInfo snapshot (JSON)     |
//! | `<db>/Y\|<docid>`        | system doc body             |
//! | `<db>/M\|update_seq`     | big-endian u64              |
//!
//! The store-level catalog maps database names to DbIds under `@catalog/`.
//! Keys are never parsed back into components; scans recover ids from the
//! decoded values, so docids may contain any byte.

use crate::revision::RevId;

/// Opaque database identifier (a freshly minted UUID per database)
pub type DbId = String;

/// Namespace tags, one byte each
const DOC_INFO: u8 = b'D';
const DOC_BODY: u8 = b'B';
const BY_SEQ: u8 = b'S';
const SYSTEM: u8 = b'Y';
const META: u8 = b'M';

fn ns(db: &str, tag: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(db.len() + 3);
    key.extend_from_slice(db.as_bytes());
    key.push(b'/');
    key.push(tag);
    key.push(b'|');
    key
}

/// Prefix owned by one database (all namespaces)
pub fn db_prefix(db: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(db.len() + 1);
    key.extend_from_slice(db.as_bytes());
    key.push(b'/');
    key
}

/// Prefix of the doc-info namespace
pub fn doc_info_prefix(db: &str) -> Vec<u8> {
    ns(db, DOC_INFO)
}

/// Prefix of the by-sequence namespace
pub fn by_seq_prefix(db: &str) -> Vec<u8> {
    ns(db, BY_SEQ)
}

/// DocInfo key for one document
pub fn doc_info_key(db: &str, docid: &str) -> Vec<u8> {
    let mut key = ns(db, DOC_INFO);
    key.extend_from_slice(docid.as_bytes());
    key
}

/// Body key for one (document, revision) pair
pub fn doc_body_key(db: &str, docid: &str, rev: &RevId) -> Vec<u8> {
    let mut key = ns(db, DOC_BODY);
    key.extend_from_slice(docid.as_bytes());
    key.push(b'|');
    key.extend_from_slice(rev.as_str().as_bytes());
    key
}

/// By-sequence key; big-endian so byte order equals numeric order
pub fn by_seq_key(db: &str, seq: u64) -> Vec<u8> {
    let mut key = ns(db, BY_SEQ);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// System-doc key
pub fn system_doc_key(db: &str, docid: &str) -> Vec<u8> {
    let mut key = ns(db, SYSTEM);
    key.extend_from_slice(docid.as_bytes());
    key
}

/// Meta key holding the persisted update-seq high-water mark
pub fn meta_seq_key(db: &str) -> Vec<u8> {
    let mut key = ns(db, META);
    key.extend_from_slice(b"update_seq");
    key
}

/// Store-level catalog entry: database name to DbId
pub fn catalog_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 9);
    key.extend_from_slice(b"@catalog/");
    key.extend_from_slice(name.as_bytes());
    key
}

/// Smallest key strictly greater than every key with this prefix
///
/// `None` when no such key exists (prefix of all 0xff bytes).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last() {
        if *last == 0xff {
            end.pop();
        } else {
            *end.last_mut()? += 1;
            return Some(end);
        }
    }
    None
}

/// Exclusive upper bound that admits exactly the keys `<= key`
pub fn after_key(key: &[u8]) -> Vec<u8> {
    let mut end = key.to_vec();
    end.push(0);
    end
}
