//! Document body helpers
//!
//! A document body is a JSON object with three reserved fields: `_id`
//! (stable identity), `_rev` (current revision) and `_deleted` (tombstone
//! marker). `_revisions` is attached on reads with history and never
//! stored.

use serde_json::{Map, Value};

use crate::document::errors::{DocumentError, DocumentResult};
use crate::revision::RevId;

/// Reserved field: stable document identity
pub const ID_FIELD: &str = "_id";

/// Reserved field: revision identifier
pub const REV_FIELD: &str = "_rev";

/// Reserved field: tombstone marker
pub const DELETED_FIELD: &str = "_deleted";

/// Reserved field: revision history attached on reads
pub const REVISIONS_FIELD: &str = "_revisions";

/// Require the body to be a JSON object
pub fn validate_object(body: &Value) -> DocumentResult<&Map<String, Value>> {
    body.as_object().ok_or(DocumentError::NotAnObject)
}

/// Extract `_id` if present; it must be a string
pub fn doc_id(body: &Value) -> DocumentResult<Option<&str>> {
    let map = validate_object(body)?;
    match map.get(ID_FIELD) {
        None => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(_) => Err(DocumentError::InvalidField(ID_FIELD)),
    }
}

/// Extract `_rev`, or the empty marker when absent
pub fn doc_rev(body: &Value) -> DocumentResult<RevId> {
    let map = validate_object(body)?;
    match map.get(REV_FIELD) {
        None => Ok(RevId::none()),
        Some(Value::String(rev)) if rev.is_empty() => Ok(RevId::none()),
        Some(Value::String(rev)) => Ok(RevId::new(rev.as_str())),
        Some(_) => Err(DocumentError::InvalidField(REV_FIELD)),
    }
}

/// True when the body carries `_deleted: true`
pub fn is_tombstone(body: &Value) -> bool {
    body.get(DELETED_FIELD).and_then(Value::as_bool).unwrap_or(false)
}

/// The body with `_rev` removed (the stored and hashed form)
pub fn without_rev(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove(REV_FIELD);
            Value::Object(map)
        }
        other => other.clone(),
    }
}

/// Canonical JSON form of a body
///
/// `serde_json` object maps are ordered by key, so serialization is already
/// canonical: sorted keys, no insignificant whitespace.
pub fn canonical_json(body: &Value) -> String {
    body.to_string()
}

/// The body with `_id` and `_rev` stamped in (the shape readers see)
pub fn stamped(body: &Value, id: &str, rev: &RevId) -> Value {
    let mut map = match body {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    map.insert(REV_FIELD.to_string(), Value::String(rev.as_str().to_string()));
    Value::Object(map)
}

/// A tombstone body for `delete`
pub fn tombstone(id: &str, rev: &RevId) -> Value {
    let mut map = Map::new();
    map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    map.insert(REV_FIELD.to_string(), Value::String(rev.as_str().to_string()));
    map.insert(DELETED_FIELD.to_string(), Value::Bool(true));
    Value::Object(map)
}
