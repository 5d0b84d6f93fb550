// Path: crates/storage/src/snapshot.rs
//! Chunked snapshots of consensus state for state sync.
//!
//! Layout on disk, one directory per height:
//!
//! ```text
//! <dir>/<height>/manifest.bin   bincode SnapshotManifest
//! <dir>/<height>/chunk-<i>.bin  bincode Vec<(key, value)>
//! ```
//!
//! A chunk's hash is SHA-256 of its file bytes; the snapshot hash is SHA-256
//! over the concatenated chunk hashes. The advertised metadata is the
//! bincode-encoded chunk hash list, so a restoring peer can check every chunk
//! as it arrives.

use crate::metrics::metrics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_api::storage::{Column, KvStore, WriteBatch};
use strata_crypto::algorithms::hash::{sha256, sha256_parts};
use strata_types::app::Snapshot;
use strata_types::config::SnapshotConfig;
use strata_types::error::SnapshotError;

/// The only snapshot format this node produces and accepts.
pub const SNAPSHOT_FORMAT: u32 = 1;

const MANIFEST_FILE: &str = "manifest.bin";

/// Describes one stored snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SnapshotManifest {
    /// The height the snapshot was taken at.
    pub height: u64,
    /// The snapshot format.
    pub format: u32,
    /// The application digest at `height`.
    pub app_hash: Vec<u8>,
    /// SHA-256 of each chunk file, in chunk order.
    pub chunk_hashes: Vec<[u8; 32]>,
    /// SHA-256 over the concatenated chunk hashes.
    pub hash: [u8; 32],
}

impl SnapshotManifest {
    /// Number of chunks.
    pub fn chunk_count(&self) -> u32 {
        u32::try_from(self.chunk_hashes.len()).unwrap_or(u32::MAX)
    }

    /// The metadata advertised to peers.
    pub fn to_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let metadata = bincode::serialize(&self.chunk_hashes)
            .map_err(|e| SnapshotError::Codec(e.to_string()))?;
        Ok(Snapshot {
            height: self.height,
            format: self.format,
            chunks: self.chunk_count(),
            hash: self.hash.to_vec(),
            metadata,
        })
    }
}

fn combined_hash(chunk_hashes: &[[u8; 32]]) -> [u8; 32] {
    sha256_parts(chunk_hashes.iter().map(|h| h.as_slice()))
}

/// Splits ordered pairs into encoded chunks of roughly `chunk_size` bytes.
/// Always yields at least one chunk.
fn encode_chunks(
    pairs: &[(Vec<u8>, Vec<u8>)],
    chunk_size: usize,
) -> Result<Vec<Vec<u8>>, SnapshotError> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut size = 0usize;
    for (i, (k, v)) in pairs.iter().enumerate() {
        size += k.len() + v.len();
        if size >= chunk_size {
            let part = pairs.get(start..=i).unwrap_or_default();
            chunks.push(bincode::serialize(part).map_err(|e| SnapshotError::Codec(e.to_string()))?);
            start = i + 1;
            size = 0;
        }
    }
    if start < pairs.len() || chunks.is_empty() {
        let part = pairs.get(start..).unwrap_or_default();
        chunks.push(bincode::serialize(part).map_err(|e| SnapshotError::Codec(e.to_string()))?);
    }
    Ok(chunks)
}

/// Creates, lists, serves and prunes snapshots in a directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    chunk_size: usize,
    max_snapshots: usize,
}

impl SnapshotStore {
    /// A store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, cfg: &SnapshotConfig) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: cfg.chunk_size.max(1),
            max_snapshots: cfg.max_snapshots.max(1),
        }
    }

    fn height_dir(&self, height: u64) -> PathBuf {
        self.dir.join(format!("{:020}", height))
    }

    fn chunk_path(dir: &Path, index: u32) -> PathBuf {
        dir.join(format!("chunk-{}.bin", index))
    }

    /// Writes a snapshot of `pairs` (the full consensus column in key order)
    /// and prunes the oldest snapshots beyond the retention limit.
    pub fn create(
        &self,
        height: u64,
        app_hash: &[u8],
        pairs: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<SnapshotManifest, SnapshotError> {
        let chunks = encode_chunks(pairs, self.chunk_size)?;
        let tmp = self.dir.join(format!(".tmp-{}", height));
        if tmp.exists() {
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;

        let mut chunk_hashes = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let index = u32::try_from(i).map_err(|e| SnapshotError::Codec(e.to_string()))?;
            std::fs::write(Self::chunk_path(&tmp, index), chunk)?;
            chunk_hashes.push(sha256(chunk));
        }
        let manifest = SnapshotManifest {
            height,
            format: SNAPSHOT_FORMAT,
            app_hash: app_hash.to_vec(),
            hash: combined_hash(&chunk_hashes),
            chunk_hashes,
        };
        let encoded =
            bincode::serialize(&manifest).map_err(|e| SnapshotError::Codec(e.to_string()))?;
        std::fs::write(tmp.join(MANIFEST_FILE), encoded)?;

        let target = self.height_dir(height);
        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        std::fs::rename(&tmp, &target)?;
        metrics().inc_snapshots_created();
        tracing::info!(
            target: "snapshot",
            height,
            chunks = manifest.chunk_count(),
            records = pairs.len(),
            "created snapshot"
        );
        self.prune()?;
        Ok(manifest)
    }

    /// Every stored snapshot, oldest first.
    pub fn list(&self) -> Result<Vec<SnapshotManifest>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let manifest_path = entry.path().join(MANIFEST_FILE);
            let is_snapshot = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.parse::<u64>().is_ok());
            if !is_snapshot || !manifest_path.exists() {
                continue;
            }
            let bytes = std::fs::read(&manifest_path)?;
            let manifest: SnapshotManifest = bincode::deserialize(&bytes)
                .map_err(|e| SnapshotError::Codec(e.to_string()))?;
            out.push(manifest);
        }
        out.sort_by_key(|m| m.height);
        Ok(out)
    }

    /// The height of the newest snapshot.
    pub fn latest_height(&self) -> Result<Option<u64>, SnapshotError> {
        Ok(self.list()?.last().map(|m| m.height))
    }

    /// Reads one chunk.
    pub fn load_chunk(&self, height: u64, format: u32, index: u32) -> Result<Vec<u8>, SnapshotError> {
        if format != SNAPSHOT_FORMAT {
            return Err(SnapshotError::NotFound { height, format });
        }
        let dir = self.height_dir(height);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(SnapshotError::NotFound { height, format });
        }
        let manifest: SnapshotManifest = bincode::deserialize(&std::fs::read(manifest_path)?)
            .map_err(|e| SnapshotError::Codec(e.to_string()))?;
        if index >= manifest.chunk_count() {
            return Err(SnapshotError::ChunkOutOfRange {
                index,
                count: manifest.chunk_count(),
            });
        }
        Ok(std::fs::read(Self::chunk_path(&dir, index))?)
    }

    fn prune(&self) -> Result<(), SnapshotError> {
        let all = self.list()?;
        let excess = all.len().saturating_sub(self.max_snapshots);
        for manifest in all.iter().take(excess) {
            std::fs::remove_dir_all(self.height_dir(manifest.height))?;
            tracing::debug!(target: "snapshot", height = manifest.height, "pruned snapshot");
        }
        Ok(())
    }
}

/// An in-progress restore from an offered snapshot.
#[derive(Debug)]
pub struct RestoreSession {
    height: u64,
    app_hash: Vec<u8>,
    chunk_hashes: Vec<[u8; 32]>,
    next: u32,
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RestoreSession {
    /// Validates an offered snapshot against its metadata.
    pub fn begin(snapshot: &Snapshot, app_hash: &[u8]) -> Result<Self, SnapshotError> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(SnapshotError::UnsupportedFormat(snapshot.format));
        }
        let chunk_hashes: Vec<[u8; 32]> = bincode::deserialize(&snapshot.metadata)
            .map_err(|e| SnapshotError::InvalidMetadata(e.to_string()))?;
        if chunk_hashes.is_empty() || chunk_hashes.len() != snapshot.chunks as usize {
            return Err(SnapshotError::InvalidMetadata(format!(
                "{} chunk hashes for {} chunks",
                chunk_hashes.len(),
                snapshot.chunks
            )));
        }
        if combined_hash(&chunk_hashes).as_slice() != snapshot.hash.as_slice() {
            return Err(SnapshotError::InvalidMetadata(
                "snapshot hash does not match chunk hashes".into(),
            ));
        }
        Ok(Self {
            height: snapshot.height,
            app_hash: app_hash.to_vec(),
            chunk_hashes,
            next: 0,
            pairs: Vec::new(),
        })
    }

    /// The snapshot height.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// The trusted application digest at the snapshot height.
    pub fn app_hash(&self) -> &[u8] {
        &self.app_hash
    }

    /// The index of the next expected chunk.
    pub fn next_chunk(&self) -> u32 {
        self.next
    }

    /// Whether every chunk has been applied.
    pub fn is_complete(&self) -> bool {
        self.next as usize == self.chunk_hashes.len()
    }

    /// Verifies and buffers one chunk. Returns true once the last chunk is in.
    pub fn apply_chunk(&mut self, index: u32, chunk: &[u8]) -> Result<bool, SnapshotError> {
        let count = u32::try_from(self.chunk_hashes.len()).unwrap_or(u32::MAX);
        let expected = self
            .chunk_hashes
            .get(index as usize)
            .ok_or(SnapshotError::ChunkOutOfRange { index, count })?;
        if index != self.next {
            return Err(SnapshotError::OutOfOrderChunk {
                expected: self.next,
                got: index,
            });
        }
        if &sha256(chunk) != expected {
            return Err(SnapshotError::ChunkHashMismatch(index));
        }
        let pairs: Vec<(Vec<u8>, Vec<u8>)> =
            bincode::deserialize(chunk).map_err(|e| SnapshotError::Codec(e.to_string()))?;
        self.pairs.extend(pairs);
        self.next += 1;
        metrics().inc_snapshot_chunks_applied();
        Ok(self.is_complete())
    }

    /// Replaces the store's consensus column with the restored records in one batch.
    pub fn finish(self, store: &dyn KvStore) -> Result<(), SnapshotError> {
        if !self.is_complete() {
            return Err(SnapshotError::InvalidMetadata(format!(
                "restore incomplete: {} of {} chunks",
                self.next,
                self.chunk_hashes.len()
            )));
        }
        let mut batch = WriteBatch::new();
        for (key, _) in store
            .scan_prefix(Column::Consensus, &[])
            .map_err(|e| SnapshotError::Storage(e.to_string()))?
        {
            batch.delete(Column::Consensus, key);
        }
        let records = self.pairs.len();
        for (key, value) in self.pairs {
            batch.put(Column::Consensus, key, value);
        }
        store
            .write_batch(batch)
            .map_err(|e| SnapshotError::Storage(e.to_string()))?;
        tracing::info!(target: "snapshot", height = self.height, records, "restored snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
