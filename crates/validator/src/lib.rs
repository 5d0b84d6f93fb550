// Path: crates/validator/src/lib.rs
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

//! # Strata Validator
//!
//! The consensus-facing side of a Strata node. [`ConsensusApp`] implements
//! [`strata_api::consensus::ConsensusApplication`]: mempool admission,
//! proposal assembly and validation, block execution through
//! [`strata_execution::BlockExecutor`], queries, vote extensions and state
//! sync.

pub mod app;

pub use app::{AppParts, ConsensusApp};
