// Path: crates/validator/src/app/sig_cache.rs
//! Hashes of transactions whose signature already verified at admission.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Default number of remembered hashes.
pub const DEFAULT_CAPACITY: usize = 50_000;

/// A bounded set of transaction hashes with verified signatures.
///
/// Proposal validation may skip re-verifying a hash found here. Hashes are
/// evicted once their transaction executes, and the oldest entries fall out
/// when the cache is full.
pub struct VerifiedSignatures {
    inner: Mutex<LruCache<[u8; 32], ()>>,
}

impl VerifiedSignatures {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn insert(&self, hash: [u8; 32]) {
        self.inner.lock().put(hash, ());
    }

    pub fn contains(&self, hash: &[u8; 32]) -> bool {
        self.inner.lock().contains(hash)
    }

    /// Forgets every hash in `hashes`.
    pub fn evict<'a>(&self, hashes: impl IntoIterator<Item = &'a [u8; 32]>) {
        let mut inner = self.inner.lock();
        for hash in hashes {
            inner.pop(hash);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for VerifiedSignatures {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_executed_and_oldest() {
        let cache = VerifiedSignatures::new(2);
        cache.insert([1; 32]);
        cache.insert([2; 32]);
        cache.insert([3; 32]);
        assert!(!cache.contains(&[1; 32]));
        assert!(cache.contains(&[2; 32]));

        cache.evict([[2u8; 32]].iter());
        assert!(!cache.contains(&[2; 32]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let cache = VerifiedSignatures::new(0);
        cache.insert([9; 32]);
        assert!(cache.contains(&[9; 32]));
    }
}
