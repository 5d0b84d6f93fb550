// Path: crates/storage/src/snapshot/tests.rs
use super::*;
use crate::MemoryStore;

fn pairs(n: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..n)
        .map(|i| (format!("key::{:04}", i).into_bytes(), vec![i as u8; 40]))
        .collect()
}

fn cfg(chunk_size: usize, max_snapshots: usize) -> SnapshotConfig {
    SnapshotConfig {
        enabled: true,
        interval: 10,
        max_snapshots,
        chunk_size,
    }
}

#[test]
fn chunking_respects_size_and_never_yields_zero_chunks() {
    assert_eq!(encode_chunks(&[], 100).unwrap().len(), 1);
    let data = pairs(10);
    // Each pair is 49 bytes, so every third pair closes a chunk.
    let chunks = encode_chunks(&data, 120).unwrap();
    assert_eq!(chunks.len(), 4);
    let mut decoded = Vec::new();
    for c in &chunks {
        let part: Vec<(Vec<u8>, Vec<u8>)> = bincode::deserialize(c).unwrap();
        decoded.extend(part);
    }
    assert_eq!(decoded, data);
}

#[test]
fn create_list_and_prune() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path(), &cfg(200, 2));
    for h in [10, 20, 30] {
        store.create(h, &[h as u8; 32], &pairs(5)).unwrap();
    }
    let heights: Vec<u64> = store.list().unwrap().iter().map(|m| m.height).collect();
    assert_eq!(heights, vec![20, 30]);
    assert_eq!(store.latest_height().unwrap(), Some(30));
    assert!(matches!(
        store.load_chunk(10, SNAPSHOT_FORMAT, 0),
        Err(SnapshotError::NotFound { .. })
    ));
    assert!(matches!(
        store.load_chunk(30, SNAPSHOT_FORMAT, 99),
        Err(SnapshotError::ChunkOutOfRange { .. })
    ));
}

#[test]
fn restore_roundtrip_replaces_consensus_column() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path(), &cfg(100, 3));
    let data = pairs(7);
    let manifest = snapshots.create(42, b"apphash", &data).unwrap();
    let offered = manifest.to_snapshot().unwrap();
    assert!(offered.chunks > 1);

    let target = MemoryStore::new();
    let mut stale = WriteBatch::new();
    stale.put(Column::Consensus, b"stale".to_vec(), b"x".to_vec());
    stale.put(Column::Local, b"keep".to_vec(), b"y".to_vec());
    target.write_batch(stale).unwrap();

    let mut session = RestoreSession::begin(&offered, b"apphash").unwrap();
    for i in 0..offered.chunks {
        let chunk = snapshots.load_chunk(42, SNAPSHOT_FORMAT, i).unwrap();
        let done = session.apply_chunk(i, &chunk).unwrap();
        assert_eq!(done, i + 1 == offered.chunks);
    }
    session.finish(&target).unwrap();

    assert_eq!(target.scan_prefix(Column::Consensus, &[]).unwrap(), data);
    assert_eq!(target.get(Column::Local, b"keep").unwrap(), Some(b"y".to_vec()));
}

#[test]
fn restore_rejects_bad_offers_and_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = SnapshotStore::new(dir.path(), &cfg(100, 3));
    let offered = snapshots.create(5, b"h", &pairs(7)).unwrap().to_snapshot().unwrap();

    let mut wrong_format = offered.clone();
    wrong_format.format = 9;
    assert!(matches!(
        RestoreSession::begin(&wrong_format, b"h"),
        Err(SnapshotError::UnsupportedFormat(9))
    ));
    let mut wrong_hash = offered.clone();
    wrong_hash.hash = vec![0; 32];
    assert!(matches!(
        RestoreSession::begin(&wrong_hash, b"h"),
        Err(SnapshotError::InvalidMetadata(_))
    ));

    let mut session = RestoreSession::begin(&offered, b"h").unwrap();
    let chunk1 = snapshots.load_chunk(5, SNAPSHOT_FORMAT, 1).unwrap();
    assert!(matches!(
        session.apply_chunk(1, &chunk1),
        Err(SnapshotError::OutOfOrderChunk { expected: 0, got: 1 })
    ));
    assert!(matches!(
        session.apply_chunk(0, &chunk1),
        Err(SnapshotError::ChunkHashMismatch(0))
    ));
    assert_eq!(session.next_chunk(), 0);
    assert!(session.finish(&MemoryStore::new()).is_err());
}
