// Path: crates/storage/src/local.rs
//! Events this node observed on its own, stored in the local column.
//!
//! Listeners that feed this store are external; block execution only reads
//! it and queues deletes or `received` flags that are written at commit.

use std::sync::Arc;
use strata_api::storage::{Column, KvStore, StorageError, WriteBatch};
use strata_types::app::{LocalEvent, ResolutionId, VotableEvent};
use strata_types::codec;
use strata_types::keys::{local_event_key, LOCAL_EVENT_KEY_PREFIX};

/// Typed access to [`LocalEvent`] records.
#[derive(Clone)]
pub struct LocalEventStore {
    store: Arc<dyn KvStore>,
}

impl LocalEventStore {
    /// Wraps a store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Records a newly observed event. Re-observing a known event keeps its flag.
    pub fn observe(&self, event: VotableEvent) -> Result<ResolutionId, StorageError> {
        let id = event.id();
        if self.get(&id)?.is_some() {
            return Ok(id);
        }
        let record = LocalEvent {
            event,
            received: false,
        };
        let bytes = codec::to_bytes_canonical(&record).map_err(StorageError::Encode)?;
        let mut batch = WriteBatch::new();
        batch.put(Column::Local, local_event_key(&id), bytes);
        self.store.write_batch(batch)?;
        tracing::debug!(target: "storage", id = %id, "observed local event");
        Ok(id)
    }

    /// Reads one event.
    pub fn get(&self, id: &ResolutionId) -> Result<Option<LocalEvent>, StorageError> {
        self.store
            .get(Column::Local, &local_event_key(id))?
            .map(|bytes| codec::from_bytes_canonical(&bytes).map_err(StorageError::Decode))
            .transpose()
    }

    /// Every stored event, in id order.
    pub fn all(&self) -> Result<Vec<(ResolutionId, LocalEvent)>, StorageError> {
        self.store
            .scan_prefix(Column::Local, LOCAL_EVENT_KEY_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let id = key
                    .strip_prefix(LOCAL_EVENT_KEY_PREFIX)
                    .and_then(|s| <[u8; 16]>::try_from(s).ok())
                    .map(ResolutionId)
                    .ok_or_else(|| {
                        StorageError::Decode(format!("malformed local event key {}", hex::encode(&key)))
                    })?;
                let record =
                    codec::from_bytes_canonical(&value).map_err(StorageError::Decode)?;
                Ok((id, record))
            })
            .collect()
    }

    /// Queues the removal of an event.
    pub fn queue_delete(batch: &mut WriteBatch, id: &ResolutionId) {
        batch.delete(Column::Local, local_event_key(id));
    }

    /// Queues setting the `received` flag, if the event is still stored.
    pub fn queue_mark_received(
        &self,
        batch: &mut WriteBatch,
        id: &ResolutionId,
    ) -> Result<(), StorageError> {
        if let Some(mut record) = self.get(id)? {
            record.received = true;
            let bytes = codec::to_bytes_canonical(&record).map_err(StorageError::Encode)?;
            batch.put(Column::Local, local_event_key(id), bytes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn deposit(body: &[u8]) -> VotableEvent {
        VotableEvent {
            event_type: "deposit".into(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn observe_mark_and_delete() {
        let events = LocalEventStore::new(Arc::new(MemoryStore::new()));
        let a = events.observe(deposit(b"a")).unwrap();
        let b = events.observe(deposit(b"b")).unwrap();
        assert_eq!(events.all().unwrap().len(), 2);

        let mut batch = WriteBatch::new();
        events.queue_mark_received(&mut batch, &a).unwrap();
        LocalEventStore::queue_delete(&mut batch, &b);
        events.store.write_batch(batch).unwrap();

        assert!(events.get(&a).unwrap().unwrap().received);
        assert_eq!(events.get(&b).unwrap(), None);

        // Re-observing keeps the flag.
        events.observe(deposit(b"a")).unwrap();
        assert!(events.get(&a).unwrap().unwrap().received);
    }
}
