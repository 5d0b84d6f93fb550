// Path: crates/api/src/storage/mod.rs

//! API for the durable key-value store underneath consensus and local state.

use thiserror::Error;
use strata_types::error::StateError;

/// Encodes a u64 into a big-endian byte array, suitable for ordered key scans.
#[inline]
pub fn be64(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// Represents errors that can occur within the durable storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A generic error originating from the underlying key-value store backend (e.g., redb).
    #[error("backend error: {0}")]
    Backend(String),
    /// An error occurred while serializing data for storage.
    #[error("encode error: {0}")]
    Encode(String),
    /// An error occurred while deserializing data from storage.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StorageError> for StateError {
    fn from(e: StorageError) -> Self {
        StateError::Backend(e.to_string())
    }
}

/// The keyspace a record belongs to.
///
/// `Consensus` records feed the application digest and must be identical on
/// every node. `Local` records (observed events, snapshot manifests) are
/// private to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Consensus state.
    Consensus,
    /// Node-local, non-consensus state.
    Local,
}

/// A single buffered write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite.
    Put(Column, Vec<u8>, Vec<u8>),
    /// Delete, a no-op if absent.
    Delete(Column, Vec<u8>),
}

/// An ordered set of writes applied atomically by [`KvStore::write_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an insert.
    pub fn put(&mut self, column: Column, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Put(column, key.into(), value.into()));
    }

    /// Queues a delete.
    pub fn delete(&mut self, column: Column, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete(column, key.into()));
    }

    /// Appends another batch.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// The queued operations, in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// A durable, ordered key-value store with atomic batch writes.
pub trait KvStore: Send + Sync {
    /// Reads one key.
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns every pair whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Applies every operation in `batch` atomically and durably.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(column, key)
    }

    fn scan_prefix(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        (**self).scan_prefix(column, prefix)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        (**self).write_batch(batch)
    }
}
