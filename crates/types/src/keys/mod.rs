// Path: crates/types/src/keys/mod.rs
//! Defines constants for well-known state keys.
//!
//! These constants are the single source of truth for where each record lives
//! in consensus state. Every key is a byte prefix followed by the record's
//! identifying bytes, so a prefix scan enumerates one record family in key order.

use crate::app::ResolutionId;

/// The state key for the persisted chain status (height and app hash).
pub const CHAIN_STATUS_KEY: &[u8] = b"chain::status";

/// The state key for the chain id recorded at genesis.
pub const CHAIN_ID_KEY: &[u8] = b"chain::id";

/// The state key prefix for account records, keyed by identity.
pub const ACCOUNT_KEY_PREFIX: &[u8] = b"account::";

/// The state key prefix for validator power, keyed by public key.
pub const VALIDATOR_KEY_PREFIX: &[u8] = b"validators::";

/// The state key prefix for resolution records, keyed by resolution id.
pub const RESOLUTION_KEY_PREFIX: &[u8] = b"voting::resolution::";

/// The state key prefix for processed-resolution markers, keyed by resolution id.
pub const PROCESSED_KEY_PREFIX: &[u8] = b"voting::processed::";

/// The local (non-consensus) key prefix for events observed by this node.
pub const LOCAL_EVENT_KEY_PREFIX: &[u8] = b"local::event::";

fn with_prefix(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

/// The state key for an account.
pub fn account_key(identifier: &[u8]) -> Vec<u8> {
    with_prefix(ACCOUNT_KEY_PREFIX, identifier)
}

/// The state key for a validator's power.
pub fn validator_key(pub_key: &[u8]) -> Vec<u8> {
    with_prefix(VALIDATOR_KEY_PREFIX, pub_key)
}

/// The state key for a resolution.
pub fn resolution_key(id: &ResolutionId) -> Vec<u8> {
    with_prefix(RESOLUTION_KEY_PREFIX, id.as_bytes())
}

/// The state key for a processed marker.
pub fn processed_key(id: &ResolutionId) -> Vec<u8> {
    with_prefix(PROCESSED_KEY_PREFIX, id.as_bytes())
}

/// The local key for an observed event.
pub fn local_event_key(id: &ResolutionId) -> Vec<u8> {
    with_prefix(LOCAL_EVENT_KEY_PREFIX, id.as_bytes())
}
