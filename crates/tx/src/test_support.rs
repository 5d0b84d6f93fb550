// Path: crates/tx/src/test_support.rs
//! Shared helpers for this crate's unit tests.

use strata_api::state::{StateOverlay, StateRead, StateScanIter};
use strata_types::app::{Payload, Transaction};
use strata_types::error::StateError;

/// A base that holds nothing; every test scope is an overlay over it.
pub struct EmptyState;

impl StateRead for EmptyState {
    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(None)
    }

    fn prefix_scan(&self, _prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        Ok(Box::new(std::iter::empty()))
    }
}

pub type TestState = StateOverlay<EmptyState>;

pub fn fresh() -> TestState {
    StateOverlay::new(EmptyState)
}

/// An unsigned transaction attributed to `sender`.
pub fn tx_from<P: Payload>(sender: &[u8], payload: &P, fee: u128, nonce: u64) -> Transaction {
    let mut tx = Transaction::new_unsigned(payload, fee, nonce, "test-chain");
    tx.sender = sender.to_vec();
    tx
}
