// Path: crates/api/src/state/typed.rs
//! SCALE-typed helpers over raw state access.

use crate::state::{StateAccess, StateRead};
use parity_scale_codec::{Decode, Encode};
use strata_types::codec::{from_bytes_canonical, to_bytes_canonical};
use strata_types::error::StateError;

/// Typed reads for any [`StateRead`].
pub trait StateReadExt: StateRead {
    /// Reads and decodes a value.
    fn get_decoded<T: Decode>(&self, key: &[u8]) -> Result<Option<T>, StateError> {
        self.get(key)?
            .map(|bytes| from_bytes_canonical(&bytes).map_err(StateError::Decode))
            .transpose()
    }

    /// Scans a prefix and decodes every value. Keys are returned with the
    /// prefix stripped.
    fn scan_decoded<T: Decode>(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>, StateError> {
        let mut out = Vec::new();
        for item in self.prefix_scan(prefix)? {
            let (key, value) = item?;
            let suffix = key.get(prefix.len()..).unwrap_or_default().to_vec();
            let decoded = from_bytes_canonical(&value).map_err(StateError::Decode)?;
            out.push((suffix, decoded));
        }
        Ok(out)
    }
}

impl<S: StateRead + ?Sized> StateReadExt for S {}

/// Typed writes for any [`StateAccess`].
pub trait StateWriteExt: StateAccess {
    /// Encodes and writes a value.
    fn put_encoded<T: Encode>(&mut self, key: &[u8], value: &T) -> Result<(), StateError> {
        let bytes = to_bytes_canonical(value).map_err(StateError::InvalidValue)?;
        self.insert(key, &bytes)
    }
}

impl<S: StateAccess + ?Sized> StateWriteExt for S {}
