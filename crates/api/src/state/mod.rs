// Path: crates/api/src/state/mod.rs
//! Core traits for state access.
//!
//! - `StateRead`: read-only key-value access, the base of every scope.
//! - `StateAccess`: read-write access, implemented by overlays.
//! - `StateOverlay`: a copy-on-write scope over any `StateRead`; nesting
//!   overlays gives independent rollback for inner scopes.

use strata_types::error::StateError;
use std::sync::Arc;

/// An atomically reference-counted, owned key slice.
pub type StateKey = Arc<[u8]>;
/// An atomically reference-counted, owned value slice.
pub type StateVal = Arc<[u8]>;
/// An owned key-value pair from the state, using cheap-to-clone Arcs.
pub type StateKVPair = (StateKey, StateVal);
/// A streaming iterator over key-value pairs from the state, in key order.
pub type StateScanIter<'a> = Box<dyn Iterator<Item = Result<StateKVPair, StateError>> + Send + 'a>;

mod accessor;
mod overlay;
mod typed;

pub use accessor::*;
pub use overlay::*;
pub use typed::*;

#[cfg(test)]
mod tests;
