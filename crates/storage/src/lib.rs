// Path: crates/storage/src/lib.rs
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

//! Persistent storage for the Strata node.
//!
//! [`RedbStore`] keeps consensus and node-local records in two redb tables
//! and applies every [`WriteBatch`](strata_api::storage::WriteBatch) in a
//! single write transaction, so a block and its chain status land together
//! or not at all. [`MemoryStore`] is the in-memory equivalent for tests.
//! [`StoreView`] exposes the consensus table as a
//! [`StateRead`](strata_api::state::StateRead) base for block overlays, and
//! [`SnapshotStore`] produces and restores chunked state-sync snapshots.

pub mod local;
pub mod memory;
pub mod metrics;
pub mod redb_store;
pub mod snapshot;
pub mod view;

pub use local::LocalEventStore;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use snapshot::{RestoreSession, SnapshotManifest, SnapshotStore, SNAPSHOT_FORMAT};
pub use view::StoreView;
