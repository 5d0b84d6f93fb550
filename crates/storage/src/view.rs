// Path: crates/storage/src/view.rs
//! A [`StateRead`] over the committed consensus column of a [`KvStore`].

use std::sync::Arc;
use strata_api::state::{StateRead, StateScanIter};
use strata_api::storage::{Column, KvStore};
use strata_types::error::StateError;

/// Read-only view of committed consensus state.
///
/// Block execution stacks overlays on top of this view; nothing is written
/// through it.
pub struct StoreView<S: ?Sized> {
    store: Arc<S>,
}

impl<S: KvStore + ?Sized> StoreView<S> {
    /// Wraps a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: ?Sized> Clone for StoreView<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore + ?Sized> StateRead for StoreView<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.store.get(Column::Consensus, key)?)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let pairs = self.store.scan_prefix(Column::Consensus, prefix)?;
        Ok(Box::new(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((Arc::from(k), Arc::from(v)))),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use strata_api::state::{StateAccess, StateOverlay};
    use strata_api::storage::WriteBatch;

    #[test]
    fn overlay_over_view_sees_only_consensus_records() {
        let store = Arc::new(MemoryStore::new());
        let mut batch = WriteBatch::new();
        batch.put(Column::Consensus, b"p::a".to_vec(), b"1".to_vec());
        batch.put(Column::Local, b"p::b".to_vec(), b"local".to_vec());
        store.write_batch(batch).unwrap();

        let view = StoreView::new(store.clone());
        let mut overlay = StateOverlay::new(view);
        overlay.insert(b"p::c", b"3").unwrap();
        let keys: Vec<Vec<u8>> = overlay
            .prefix_scan(b"p::")
            .unwrap()
            .map(|r| r.unwrap().0.to_vec())
            .collect();
        assert_eq!(keys, vec![b"p::a".to_vec(), b"p::c".to_vec()]);
        // Nothing reaches the store until the overlay is drained by the caller.
        assert_eq!(store.get(Column::Consensus, b"p::c").unwrap(), None);
    }
}
