// Path: crates/api/src/error/mod.rs
//! Re-exports all core error types from the central `strata-types` crate.

pub use strata_types::error::*;
