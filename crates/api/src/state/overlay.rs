// Path: crates/api/src/state/overlay.rs

//! A copy-on-write state overlay.
//!
//! An overlay buffers writes over a read-only base. Dropping it discards the
//! writes; [`StateOverlay::into_ordered_batch`] hands them to the parent scope.
//! Overlays nest, so a block scope can hold a fee scope that holds a mutation
//! scope, each rolled back independently.

use crate::state::{StateAccess, StateKVPair, StateRead, StateScanIter};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::{Fuse, Peekable};
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;
use strata_types::error::StateError;

/// A batch of key-value pairs to be inserted or updated in the state.
pub type StateInserts = Vec<(Vec<u8>, Vec<u8>)>;

/// A batch of keys to be deleted from the state.
pub type StateDeletes = Vec<Vec<u8>>;

/// A complete set of state changes (inserts/updates and deletes) from a scope.
pub type StateChangeSet = (StateInserts, StateDeletes);

/// Calculates the smallest byte vector that is strictly greater than all keys
/// starting with the given prefix. Returns None if the prefix is all 0xFF bytes.
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut ub = prefix.to_vec();
    while let Some(last) = ub.pop() {
        if last != 0xFF {
            ub.push(last + 1);
            return Some(ub);
        }
    }
    None
}

/// Applies a changeset produced by a child scope to its parent.
pub fn apply_changeset<S: StateAccess + ?Sized>(
    target: &mut S,
    (inserts, deletes): &StateChangeSet,
) -> Result<(), StateError> {
    target.batch_apply(inserts, deletes)
}

struct MergingIterator<'a> {
    base: Peekable<Fuse<StateScanIter<'a>>>,
    writes: Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> Iterator for MergingIterator<'a> {
    type Item = Result<StateKVPair, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let base_key = match self.base.peek() {
                Some(Err(_)) => return self.base.next(),
                Some(Ok((k, _))) => Some(k.as_ref()),
                None => None,
            };
            let write_key = self.writes.peek().map(|(k, _)| k.as_slice());

            let take_write = match (base_key, write_key) {
                (Some(bk), Some(wk)) => match bk.cmp(wk) {
                    Ordering::Less => false,
                    Ordering::Equal => {
                        // The write shadows the base entry.
                        self.base.next();
                        true
                    }
                    Ordering::Greater => true,
                },
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (None, None) => return None,
            };

            if !take_write {
                return self.base.next();
            }
            if let Some((key, Some(val))) = self.writes.next() {
                return Some(Ok((Arc::from(key.as_slice()), Arc::from(val.as_slice()))));
            }
            // A tombstone: skip it and keep merging.
        }
    }
}

/// An in-memory, copy-on-write overlay for any `StateRead` base.
///
/// Reads check the local write set first and fall through to the base. Writes
/// never reach the base.
#[derive(Clone)]
pub struct StateOverlay<B> {
    base: B,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<B: StateRead> StateOverlay<B> {
    /// Creates a new, empty overlay on top of a base.
    pub fn new(base: B) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Returns the base this overlay reads through to.
    pub fn base(&self) -> &B {
        &self.base
    }

    /// Number of buffered writes, tombstones included.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Returns true if no writes are buffered.
    pub fn is_clean(&self) -> bool {
        self.writes.is_empty()
    }

    /// Consumes the overlay and returns its writes in ascending key order.
    pub fn into_ordered_batch(self) -> StateChangeSet {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();
        for (key, value_opt) in self.writes {
            match value_opt {
                Some(value) => inserts.push((key, value)),
                None => deletes.push(key),
            }
        }
        (inserts, deletes)
    }
}

impl<B: StateRead> StateRead for StateOverlay<B> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.writes.get(key) {
            Some(value_opt) => Ok(value_opt.clone()),
            None => self.base.get(key),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let base = self.base.prefix_scan(prefix)?.fuse().peekable();
        let start = Included(prefix.to_vec());
        let end = match next_prefix(prefix) {
            Some(ub) => Excluded(ub),
            None => Unbounded,
        };
        let writes = self.writes.range((start, end)).peekable();
        Ok(Box::new(MergingIterator { base, writes }))
    }
}

impl<B: StateRead> StateAccess for StateOverlay<B> {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }
}
