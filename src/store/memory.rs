//! In-memory key-value engine
//!
//! A `BTreeMap` behind an `RwLock`. Readers run in parallel; a write batch
//! takes the write lock for its whole application, which is what makes the
//! batch atomic with respect to readers. Scans snapshot the requested range
//! before visiting rows, so the visitor never runs under the lock.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use super::engine::{BatchOp, KvEngine, ScanStep, WriteBatch};
use super::errors::{StoreError, StoreResult};

/// In-memory ordered KV engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.map.read().map(|m| m.len()).unwrap_or(0)
    }

    /// True when no keys are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let map = self.map.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        from: &[u8],
        to: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ScanStep,
    ) -> StoreResult<()> {
        if let Some(to) = to {
            if from >= to {
                return Ok(());
            }
        }

        let rows: Vec<(Vec<u8>, Vec<u8>)> = {
            let map = self.map.read().map_err(|_| poisoned())?;
            let upper = match to {
                Some(to) => Bound::Excluded(to.to_vec()),
                None => Bound::Unbounded,
            };
            map.range((Bound::Included(from.to_vec()), upper))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        for (key, value) in rows {
            if visit(&key, &value) == ScanStep::Stop {
                break;
            }
        }
        Ok(())
    }
}
