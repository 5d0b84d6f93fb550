// Path: crates/execution/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! # Strata Execution
//!
//! Turns decided blocks into state. The [`BlockExecutor`] applies genesis,
//! runs each transaction through the router inside a block overlay, settles
//! resolutions at the end of the block and holds the result until commit.

pub mod app;

pub use app::{BlockExecutor, CommitOutcome, ExecutorConfig};
