// Path: crates/api/src/transaction/mod.rs
//! Defines the per-transaction execution context.

/// The stable context handed to every route.
pub mod context;
