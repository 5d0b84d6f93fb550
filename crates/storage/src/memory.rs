// Path: crates/storage/src/memory.rs
//! An in-memory [`KvStore`] for tests and tooling.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use strata_api::storage::{Column, KvStore, StorageError, WriteBatch, WriteOp};

#[derive(Default)]
struct Tables {
    consensus: BTreeMap<Vec<u8>, Vec<u8>>,
    local: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Tables {
    fn column(&self, column: Column) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        match column {
            Column::Consensus => &self.consensus,
            Column::Local => &self.local,
        }
    }

    fn column_mut(&mut self, column: Column) -> &mut BTreeMap<Vec<u8>, Vec<u8>> {
        match column {
            Column::Consensus => &mut self.consensus,
            Column::Local => &mut self.local,
        }
    }
}

/// Two ordered maps behind one lock; a batch is applied under a single write guard.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `column`.
    pub fn len(&self, column: Column) -> usize {
        self.tables.read().column(column).len()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tables.read().column(column).get(key).cloned())
    }

    fn scan_prefix(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let tables = self.tables.read();
        Ok(tables
            .column(column)
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        for op in batch.ops() {
            match op {
                WriteOp::Put(col, k, v) => {
                    tables.column_mut(*col).insert(k.clone(), v.clone());
                }
                WriteOp::Delete(col, k) => {
                    tables.column_mut(*col).remove(k);
                }
            }
        }
        Ok(())
    }
}
