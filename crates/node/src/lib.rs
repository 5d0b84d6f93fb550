// Path: crates/node/src/lib.rs
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

//! # Strata Node
//!
//! Home-directory management, the built-in dataset registry engine and the
//! block replayer behind the `strata-node` binary.

pub mod engine;
pub mod home;
pub mod replay;
