// Path: crates/types/src/app/mod.rs
//! Core application-level data structures.

/// Accounts and validators.
pub mod account;
/// Consensus callback request and response types.
pub mod consensus;
/// Transaction payloads and the payload-type registry.
pub mod payloads;
/// Resolution ids, votable events and stored resolutions.
pub mod resolution;
/// Serde adapters for JSON views.
pub mod serde_util;
/// The signed transaction envelope and wire codec.
pub mod transaction;

pub use account::*;
pub use consensus::*;
pub use payloads::*;
pub use resolution::*;
pub use transaction::*;

/// Hex-encodes an identity for logs and query keys.
pub fn hex_identity(identity: &[u8]) -> String {
    hex::encode(identity)
}
