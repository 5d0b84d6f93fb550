// Path: crates/storage/src/redb_store.rs
use crate::metrics::metrics;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use strata_api::storage::{Column, KvStore, StorageError, WriteBatch, WriteOp};

// ---- Table definitions ----
/// Consensus state; every node holds identical contents.
const CONSENSUS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("CONSENSUS");
/// Node-local records: observed events and similar bookkeeping.
const LOCAL: TableDefinition<&[u8], &[u8]> = TableDefinition::new("LOCAL");

fn table(column: Column) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
    match column {
        Column::Consensus => CONSENSUS,
        Column::Local => LOCAL,
    }
}

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A [`KvStore`] on a single redb file.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database at `path`, creating both tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(backend)?;
        }
        let db = Database::create(path).map_err(backend)?;
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(CONSENSUS).map_err(backend)?;
            w.open_table(LOCAL).map_err(backend)?;
            w.commit().map_err(backend)?;
        }
        tracing::debug!(target: "storage", path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    fn apply_ops(w: &WriteTransaction, batch: &WriteBatch) -> Result<u64, StorageError> {
        let mut consensus = w.open_table(CONSENSUS).map_err(backend)?;
        let mut local = w.open_table(LOCAL).map_err(backend)?;
        let mut written = 0u64;
        for op in batch.ops() {
            match op {
                WriteOp::Put(col, k, v) => {
                    let t = match col {
                        Column::Consensus => &mut consensus,
                        Column::Local => &mut local,
                    };
                    t.insert(k.as_slice(), v.as_slice()).map_err(backend)?;
                    written += (k.len() + v.len()) as u64;
                }
                WriteOp::Delete(col, k) => {
                    let t = match col {
                        Column::Consensus => &mut consensus,
                        Column::Local => &mut local,
                    };
                    t.remove(k.as_slice()).map_err(backend)?;
                }
            }
        }
        Ok(written)
    }
}

impl KvStore for RedbStore {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read().map_err(backend)?;
        let t = r.open_table(table(column)).map_err(backend)?;
        let value = t.get(key).map_err(backend)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn scan_prefix(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let r = self.db.begin_read().map_err(backend)?;
        let t = r.open_table(table(column)).map_err(backend)?;
        let mut out = Vec::new();
        for entry in t.range(prefix..).map_err(backend)? {
            let (k, v) = entry.map_err(backend)?;
            if !k.value().starts_with(prefix) {
                break;
            }
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let w = self.db.begin_write().map_err(backend)?;
        let written = Self::apply_ops(&w, &batch)?;
        w.commit().map_err(backend)?;
        metrics().inc_batches_committed();
        metrics().inc_bytes_written_total(written);
        Ok(())
    }
}
