// Path: crates/crypto/src/error.rs
//! Local error types for the `strata-crypto` crate.

use thiserror::Error;

/// Errors from key handling and signing.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key bytes are malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// The key file could not be read or written.
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}
