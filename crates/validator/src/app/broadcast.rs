// Path: crates/validator/src/app/broadcast.rs

//! Per-block vote-id broadcasting.
//!
//! After every commit a validator approves, by id, the events it observed
//! on its own that it has not yet seen land on chain. The signed
//! transaction is admitted to the local mempool and parked in an
//! [`Outbox`] until the node hands it to the engine's mempool.

use parking_lot::Mutex;
use strata_api::state::StateRead;
use strata_storage::LocalEventStore;
use strata_tx::system::voting;
use strata_types::app::ResolutionId;
use strata_types::error::AppError;

/// The most recent vote-ids transaction, replaced every block.
#[derive(Default)]
pub struct Outbox {
    pending: Mutex<Option<Vec<u8>>>,
}

impl Outbox {
    pub fn replace(&self, tx: Option<Vec<u8>>) {
        *self.pending.lock() = tx;
    }

    pub fn take(&self) -> Option<Vec<u8>> {
        self.pending.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_none()
    }
}

/// Ids of local events this node has not yet seen its own approval for,
/// skipping processed ones, in id order and at most `limit`.
pub fn unreceived_ids<S: StateRead + ?Sized>(
    state: &S,
    local_events: &LocalEventStore,
    limit: usize,
) -> Result<Vec<ResolutionId>, AppError> {
    let all = local_events
        .all()
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let mut ids = Vec::new();
    for (id, local) in all {
        if ids.len() >= limit {
            break;
        }
        if local.received || voting::is_processed(state, &id)? {
            continue;
        }
        ids.push(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_api::state::StateOverlay;
    use strata_api::storage::{KvStore, WriteBatch};
    use strata_storage::{MemoryStore, StoreView};
    use strata_types::app::VotableEvent;

    fn event(body: &[u8]) -> VotableEvent {
        VotableEvent {
            event_type: "deposit".into(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn skips_received_and_processed_and_caps() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let local = LocalEventStore::new(Arc::clone(&store));
        let ids: Vec<_> = [b"a", b"b", b"c", b"d"]
            .iter()
            .map(|body| local.observe(event(*body)).unwrap())
            .collect();

        let mut batch = WriteBatch::new();
        local.queue_mark_received(&mut batch, &ids[0]).unwrap();
        store.write_batch(batch).unwrap();
        let mut state = StateOverlay::new(StoreView::new(Arc::clone(&store)));
        voting::mark_processed(&mut state, &[ids[1]]).unwrap();

        let mut open = vec![ids[2], ids[3]];
        open.sort();
        assert_eq!(unreceived_ids(&state, &local, 10).unwrap(), open);
        assert_eq!(unreceived_ids(&state, &local, 1).unwrap(), open[..1].to_vec());
        assert!(unreceived_ids(&state, &local, 0).unwrap().is_empty());
    }

    #[test]
    fn outbox_holds_one_transaction() {
        let outbox = Outbox::default();
        assert!(outbox.is_empty());
        outbox.replace(Some(vec![1]));
        outbox.replace(Some(vec![2]));
        assert_eq!(outbox.take(), Some(vec![2]));
        assert_eq!(outbox.take(), None);
    }
}
