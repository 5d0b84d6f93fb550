// Path: crates/test_utils/src/randomness/mod.rs
//! Deterministic randomness for reproducible tests.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use strata_crypto::sign::eddsa::Ed25519KeyPair;

/// A seeded generator for keys and payload bytes.
pub struct TestRng {
    rng: StdRng,
}

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.rng.fill_bytes(&mut out);
        out
    }

    /// A key pair derived from the next 32 random bytes.
    pub fn keypair(&mut self) -> Ed25519KeyPair {
        let mut seed = [0u8; 32];
        self.rng.fill_bytes(&mut seed);
        // Any 32-byte seed is a valid ed25519 secret.
        match Ed25519KeyPair::from_seed(&seed) {
            Ok(key) => key,
            Err(_) => Ed25519KeyPair::generate(),
        }
    }

    pub fn amount(&mut self, max: u128) -> u128 {
        self.rng.gen_range(0..=max)
    }
}

impl Default for TestRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_keys() {
        let a = TestRng::new(7).keypair().public_key();
        let b = TestRng::new(7).keypair().public_key();
        let c = TestRng::new(8).keypair().public_key();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn amounts_stay_in_range() {
        let mut rng = TestRng::default();
        for _ in 0..100 {
            assert!(rng.amount(10) <= 10);
        }
        assert_eq!(rng.bytes(5).len(), 5);
    }
}
