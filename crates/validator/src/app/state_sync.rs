// Path: crates/validator/src/app/state_sync.rs
//! Snapshot production and restore glue for the state-sync callbacks.

use parking_lot::Mutex;
use std::path::PathBuf;
use strata_api::storage::{Column, KvStore};
use strata_storage::{RestoreSession, SnapshotManifest, SnapshotStore};
use strata_types::app::{
    ApplySnapshotChunkRequest, ApplySnapshotChunkResponse, ApplySnapshotChunkResult, ChainStatus,
    LoadSnapshotChunkRequest, OfferSnapshotRequest, OfferSnapshotResult, Snapshot,
};
use strata_types::config::SnapshotConfig;
use strata_types::error::SnapshotError;

/// A restore that just completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub height: u64,
    pub app_hash: Vec<u8>,
}

/// Produces snapshots (when enabled) and restores offered ones.
pub struct StateSync {
    producer: Option<SnapshotStore>,
    interval: u64,
    restore: Mutex<Option<RestoreSession>>,
}

impl StateSync {
    pub fn new(dir: impl Into<PathBuf>, cfg: &SnapshotConfig) -> Self {
        Self {
            producer: cfg.enabled.then(|| SnapshotStore::new(dir, cfg)),
            interval: cfg.interval.max(1),
            restore: Mutex::new(None),
        }
    }

    /// Takes a snapshot of `store` if one is due at `status.height`: every
    /// `interval` heights, or whenever none exists yet.
    pub fn maybe_snapshot(
        &self,
        store: &dyn KvStore,
        status: &ChainStatus,
    ) -> Result<Option<SnapshotManifest>, SnapshotError> {
        let Some(producer) = &self.producer else {
            return Ok(None);
        };
        if status.height == 0 {
            return Ok(None);
        }
        let due = status.height % self.interval == 0 || producer.latest_height()?.is_none();
        if !due {
            return Ok(None);
        }
        let pairs = store
            .scan_prefix(Column::Consensus, &[])
            .map_err(|e| SnapshotError::Storage(e.to_string()))?;
        producer
            .create(status.height, &status.app_hash, &pairs)
            .map(Some)
    }

    pub fn list(&self) -> Result<Vec<Snapshot>, SnapshotError> {
        let Some(producer) = &self.producer else {
            return Ok(Vec::new());
        };
        producer
            .list()?
            .iter()
            .map(SnapshotManifest::to_snapshot)
            .collect()
    }

    pub fn load_chunk(&self, req: &LoadSnapshotChunkRequest) -> Result<Vec<u8>, SnapshotError> {
        match &self.producer {
            Some(producer) => producer.load_chunk(req.height, req.format, req.chunk),
            None => Err(SnapshotError::NotFound {
                height: req.height,
                format: req.format,
            }),
        }
    }

    /// Starts a restore if the offered snapshot's metadata checks out.
    pub fn offer(&self, req: &OfferSnapshotRequest) -> OfferSnapshotResult {
        match RestoreSession::begin(&req.snapshot, &req.app_hash) {
            Ok(session) => {
                tracing::info!(
                    target: "snapshot",
                    height = req.snapshot.height,
                    chunks = req.snapshot.chunks,
                    "accepted snapshot offer"
                );
                *self.restore.lock() = Some(session);
                OfferSnapshotResult::Accept
            }
            Err(SnapshotError::UnsupportedFormat(format)) => {
                tracing::warn!(target: "snapshot", format, "rejecting snapshot format");
                OfferSnapshotResult::RejectFormat
            }
            Err(e) => {
                tracing::warn!(target: "snapshot", error = %e, "rejecting snapshot offer");
                OfferSnapshotResult::Reject
            }
        }
    }

    /// Applies one chunk. Once the last chunk is in, the consensus column of
    /// `store` is replaced and the restored height is returned.
    pub fn apply_chunk(
        &self,
        req: &ApplySnapshotChunkRequest,
        store: &dyn KvStore,
    ) -> Result<(ApplySnapshotChunkResponse, Option<Restored>), SnapshotError> {
        let mut guard = self.restore.lock();
        let Some(session) = guard.as_mut() else {
            return Err(SnapshotError::NoRestoreInProgress);
        };
        let respond = |result, refetch_chunks: Vec<u32>, reject_senders: Vec<String>| {
            ApplySnapshotChunkResponse {
                result,
                refetch_chunks,
                reject_senders,
            }
        };

        match session.apply_chunk(req.index, &req.chunk) {
            Ok(false) => Ok((respond(ApplySnapshotChunkResult::Accept, vec![], vec![]), None)),
            Ok(true) => {
                let Some(session) = guard.take() else {
                    return Err(SnapshotError::NoRestoreInProgress);
                };
                let restored = Restored {
                    height: session.height(),
                    app_hash: session.app_hash().to_vec(),
                };
                session.finish(store)?;
                Ok((
                    respond(ApplySnapshotChunkResult::Accept, vec![], vec![]),
                    Some(restored),
                ))
            }
            Err(SnapshotError::OutOfOrderChunk { expected, .. }) => Ok((
                respond(ApplySnapshotChunkResult::Retry, vec![expected], vec![]),
                None,
            )),
            Err(e @ (SnapshotError::ChunkHashMismatch(_) | SnapshotError::Codec(_))) => {
                tracing::warn!(
                    target: "snapshot",
                    index = req.index,
                    sender = %req.sender,
                    error = %e,
                    "refetching bad chunk"
                );
                Ok((
                    respond(
                        ApplySnapshotChunkResult::Retry,
                        vec![req.index],
                        vec![req.sender.clone()],
                    ),
                    None,
                ))
            }
            Err(e) => {
                tracing::warn!(target: "snapshot", error = %e, "abandoning snapshot");
                *guard = None;
                Ok((
                    respond(ApplySnapshotChunkResult::RejectSnapshot, vec![], vec![]),
                    None,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_api::storage::WriteBatch;
    use strata_storage::MemoryStore;

    fn cfg() -> SnapshotConfig {
        SnapshotConfig {
            enabled: true,
            interval: 10,
            max_snapshots: 2,
            chunk_size: 64,
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for i in 0..20u8 {
            batch.put(Column::Consensus, vec![b'k', i], vec![i; 16]);
        }
        store.write_batch(batch).unwrap();
        store
    }

    fn status(height: u64) -> ChainStatus {
        ChainStatus {
            height,
            app_hash: vec![height as u8; 32],
        }
    }

    #[test]
    fn snapshots_follow_the_interval() {
        let dir = tempfile::tempdir().unwrap();
        let sync = StateSync::new(dir.path(), &cfg());
        let store = seeded();
        assert!(sync.maybe_snapshot(&store, &status(3)).unwrap().is_some());
        assert!(sync.maybe_snapshot(&store, &status(4)).unwrap().is_none());
        assert!(sync.maybe_snapshot(&store, &status(10)).unwrap().is_some());
        assert!(sync.maybe_snapshot(&store, &status(20)).unwrap().is_some());
        let heights: Vec<u64> = sync.list().unwrap().iter().map(|s| s.height).collect();
        assert_eq!(heights, vec![10, 20]);

        let disabled = StateSync::new(dir.path(), &SnapshotConfig::default());
        assert!(disabled.maybe_snapshot(&store, &status(30)).unwrap().is_none());
        assert!(disabled.list().unwrap().is_empty());
    }

    #[test]
    fn restore_round_trips_through_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let source = StateSync::new(dir.path(), &cfg());
        let store = seeded();
        source.maybe_snapshot(&store, &status(10)).unwrap();
        let snapshot = source.list().unwrap().remove(0);
        assert!(snapshot.chunks > 1);

        let target_store = MemoryStore::new();
        let mut stale = WriteBatch::new();
        stale.put(Column::Consensus, b"stale".to_vec(), b"x".to_vec());
        target_store.write_batch(stale).unwrap();

        let target = StateSync::new(tempfile::tempdir().unwrap().path(), &SnapshotConfig::default());
        let offer = OfferSnapshotRequest {
            snapshot: snapshot.clone(),
            app_hash: status(10).app_hash,
        };
        assert_eq!(target.offer(&offer), OfferSnapshotResult::Accept);

        let mut restored = None;
        for index in 0..snapshot.chunks {
            let chunk = source
                .load_chunk(&LoadSnapshotChunkRequest {
                    height: 10,
                    format: snapshot.format,
                    chunk: index,
                })
                .unwrap();
            let (resp, done) = target
                .apply_chunk(
                    &ApplySnapshotChunkRequest {
                        index,
                        chunk,
                        sender: "peer".into(),
                    },
                    &target_store,
                )
                .unwrap();
            assert_eq!(resp.result, ApplySnapshotChunkResult::Accept);
            restored = done;
        }
        assert_eq!(
            restored,
            Some(Restored {
                height: 10,
                app_hash: vec![10; 32]
            })
        );
        assert_eq!(
            target_store.scan_prefix(Column::Consensus, &[]).unwrap(),
            store.scan_prefix(Column::Consensus, &[]).unwrap()
        );
    }

    #[test]
    fn bad_chunks_are_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let source = StateSync::new(dir.path(), &cfg());
        source.maybe_snapshot(&seeded(), &status(10)).unwrap();
        let snapshot = source.list().unwrap().remove(0);

        let target = StateSync::new(dir.path(), &SnapshotConfig::default());
        let target_store = MemoryStore::new();
        assert!(matches!(
            target.apply_chunk(
                &ApplySnapshotChunkRequest {
                    index: 0,
                    chunk: vec![],
                    sender: "peer".into()
                },
                &target_store
            ),
            Err(SnapshotError::NoRestoreInProgress)
        ));

        target.offer(&OfferSnapshotRequest {
            snapshot,
            app_hash: vec![10; 32],
        });
        let (resp, _) = target
            .apply_chunk(
                &ApplySnapshotChunkRequest {
                    index: 0,
                    chunk: b"garbage".to_vec(),
                    sender: "evil".into(),
                },
                &target_store,
            )
            .unwrap();
        assert_eq!(resp.result, ApplySnapshotChunkResult::Retry);
        assert_eq!(resp.refetch_chunks, vec![0]);
        assert_eq!(resp.reject_senders, vec!["evil".to_string()]);

        let (resp, _) = target
            .apply_chunk(
                &ApplySnapshotChunkRequest {
                    index: 1,
                    chunk: vec![],
                    sender: "peer".into(),
                },
                &target_store,
            )
            .unwrap();
        assert_eq!(resp.result, ApplySnapshotChunkResult::Retry);
        assert_eq!(resp.refetch_chunks, vec![0]);
    }

    #[test]
    fn foreign_formats_are_rejected() {
        let sync = StateSync::new("unused", &SnapshotConfig::default());
        let offer = OfferSnapshotRequest {
            snapshot: Snapshot {
                height: 5,
                format: 99,
                chunks: 1,
                hash: vec![],
                metadata: vec![],
            },
            app_hash: vec![],
        };
        assert_eq!(sync.offer(&offer), OfferSnapshotResult::RejectFormat);
    }
}
