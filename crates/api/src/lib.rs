// Path: crates/api/src/lib.rs

//! # Strata API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # Strata API
//!
//! Core traits and interfaces for the Strata node. This crate defines the
//! stable contract between the execution pipeline and its collaborators:
//! state scopes, durable storage, authenticators, the database engine and the
//! consensus callback surface.

/// Defines the `ConsensusApplication` callback trait.
pub mod consensus;
/// Defines the `DatabaseEngine` collaborator trait.
pub mod engine;
/// Re-exports all core error types from the central `strata-types` crate.
pub mod error;
/// Defines the `Authenticator` trait and the signature-type registry.
pub mod identity;
/// Core traits for state access and nested copy-on-write scopes.
pub mod state;
/// The durable key-value store contract.
pub mod storage;
/// Defines the per-transaction execution context.
pub mod transaction;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::consensus::ConsensusApplication;
    pub use crate::engine::DatabaseEngine;
    pub use crate::error::{ErrorCode, StateError, TransactionError, TxCode};
    pub use crate::identity::{AuthRegistry, Authenticator};
    pub use crate::state::{StateAccess, StateOverlay, StateRead, StateReadExt, StateWriteExt};
    pub use crate::storage::{Column, KvStore, WriteBatch};
    pub use crate::transaction::context::TxContext;
}
