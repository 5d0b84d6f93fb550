// Path: crates/crypto/src/algorithms/hash/mod.rs
//! SHA-256 digests used across the node.

use sha2::{Digest, Sha256};

/// Length of a validator address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// SHA-256 of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Sha256::digest(data.as_ref()).into()
}

/// SHA-256 over several parts, as if they were concatenated.
pub fn sha256_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// The hash identifying a transaction: SHA-256 of its wire bytes.
pub fn tx_hash(raw_tx: &[u8]) -> [u8; 32] {
    sha256(raw_tx)
}

/// The consensus-engine address of a validator: the first 20 bytes of
/// SHA-256 of its public key.
pub fn validator_address(pub_key: &[u8]) -> [u8; ADDRESS_LEN] {
    let digest = sha256(pub_key);
    let mut addr = [0u8; ADDRESS_LEN];
    for (a, d) in addr.iter_mut().zip(digest) {
        *a = d;
    }
    addr
}

#[cfg(test)]
mod tests;
