// Path: crates/tx/src/lib.rs
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
//! # Strata Transactions
//!
//! The per-transaction half of the node: the account ledger and the
//! resolution store (both plain functions over a state scope), the
//! resolution-type registry, route pricing and execution behind the
//! [`Router`], and the block-scoped mempool admission cache.

pub mod effects;
pub mod mempool;
pub mod pricing;
pub mod router;
pub mod routes;
pub mod system;

#[cfg(test)]
mod test_support;

pub use effects::{LocalEffects, LocalOp};
pub use mempool::{order_by_sender_nonce, MempoolCache};
pub use router::{Route, Router, TxResponse};
pub use system::resolutions::{ResolutionRegistry, ResolutionType, Threshold};
