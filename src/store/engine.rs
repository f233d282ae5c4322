//! Ordered key-value engine abstraction
//!
//! The store drives an opaque ordered KV: point reads, atomic multi-key
//! write batches, and ascending range scans with cooperative early
//! termination at every row. An embedded engine (LSM or B-tree) slots in
//! behind this trait; the in-memory engine in this crate is the reference
//! implementation.

use std::fmt;

use super::errors::StoreResult;

/// One mutation inside a write batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove a key (absent keys are fine)
    Delete { key: Vec<u8> },
}

/// An atomic multi-key mutation
///
/// Operations apply in order; either the whole batch becomes visible or
/// none of it does.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert/overwrite
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    /// Stage a removal
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch into its operations
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Visitor verdict at each scanned row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Keep scanning
    Continue,
    /// Stop the scan cleanly
    Stop,
}

/// An ordered key-value engine
pub trait KvEngine: Send + Sync + fmt::Debug {
    /// Point read
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Apply a batch atomically
    fn write(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Scan `[from, to)` in ascending key order
    ///
    /// `to = None` scans to the end of the keyspace. The visitor is invoked
    /// once per row and may stop the scan at any row boundary.
    fn scan(
        &self,
        from: &[u8],
        to: Option<&[u8]>,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ScanStep,
    ) -> StoreResult<()>;
}
