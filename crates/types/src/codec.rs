// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic binary codec for all consensus-critical state.
//!
//! Everything that lands in consensus state, is signed, or feeds the application
//! digest goes through these wrappers around `parity-scale-codec` (SCALE). Keeping
//! them in the base crate guarantees every component produces the same bytes for
//! the same value.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Result<Vec<u8>, String> {
    Ok(v.encode())
}

/// Decodes a value from its canonical SCALE byte representation.
///
/// Trailing bytes are rejected, so a value has exactly one valid encoding.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}
