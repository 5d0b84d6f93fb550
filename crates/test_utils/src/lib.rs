// Path: crates/test_utils/src/lib.rs
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

//! # Strata Test Utilities
//!
//! Signed-transaction fixtures, a database engine that records what it is
//! asked to do, and [`TestNode`], a consensus application wired over an
//! in-memory store that produces blocks the way a single-validator chain would.

pub mod assertions;
pub mod engine;
pub mod fixtures;
pub mod node;
pub mod randomness;

pub use engine::{EngineCall, RecordingEngine};
pub use fixtures::TxFactory;
pub use node::{TestNode, TestNodeBuilder};
