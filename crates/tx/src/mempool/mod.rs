// Path: crates/tx/src/mempool/mod.rs

//! Pre-consensus admission against a block-scoped shadow of the ledger.
//!
//! The shadow is loaded lazily from committed state and discarded on every
//! commit. It is an estimate: exact accounting happens at execution time.

mod ordering;

pub use ordering::order_by_sender_nonce;

use crate::routes::transfer::parse_amount;
use crate::system::{accounts, voting};
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use strata_api::state::StateRead;
use strata_telemetry::sinks::mempool_metrics;
use strata_types::app::{PayloadKind, Transaction, Transfer};
use strata_types::error::TransactionError;

/// The shadow copy of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shadow {
    pub nonce: u64,
    pub balance: u128,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: AHashMap<Vec<u8>, Shadow>,
    admitted: AHashSet<[u8; 32]>,
}

/// Admits transactions in strict per-sender nonce order.
#[derive(Debug, Default)]
pub struct MempoolCache {
    inner: Mutex<Inner>,
}

impl MempoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `tx` against the shadow and, if it passes, applies its
    /// estimated spend. Re-admitting a transaction already admitted since the
    /// last reset succeeds without touching the shadow.
    pub fn admit<S: StateRead + ?Sized>(
        &self,
        state: &S,
        tx: &Transaction,
        tx_hash: [u8; 32],
        gas_enabled: bool,
    ) -> Result<(), TransactionError> {
        let result = self.admit_inner(state, tx, tx_hash, gas_enabled);
        match &result {
            Ok(()) => mempool_metrics().inc_admitted(),
            Err(e) => mempool_metrics().inc_rejected(e.tx_code().label()),
        }
        result
    }

    fn admit_inner<S: StateRead + ?Sized>(
        &self,
        state: &S,
        tx: &Transaction,
        tx_hash: [u8; 32],
        gas_enabled: bool,
    ) -> Result<(), TransactionError> {
        let kind = tx.body.payload_kind();
        if kind.is_some_and(PayloadKind::requires_validator)
            && voting::validator_power(state, &tx.sender)? == 0
        {
            return Err(TransactionError::InvalidSender(format!(
                "{} requires a validator sender",
                tx.body.payload_type
            )));
        }

        let mut inner = self.inner.lock();
        if inner.admitted.contains(&tx_hash) {
            return Ok(());
        }

        let shadow = match inner.accounts.get(&tx.sender) {
            Some(shadow) => *shadow,
            None => {
                let account = accounts::get_account(state, &tx.sender)?;
                let shadow = Shadow {
                    nonce: account.nonce,
                    balance: account.balance,
                };
                inner.accounts.insert(tx.sender.clone(), shadow);
                mempool_metrics().set_shadow_accounts(inner.accounts.len() as f64);
                shadow
            }
        };

        if gas_enabled && shadow.nonce == 0 && shadow.balance == 0 {
            return Err(TransactionError::UnfundedAccount);
        }
        let expected = shadow.nonce.saturating_add(1);
        if tx.body.nonce != expected {
            return Err(TransactionError::InvalidNonce {
                expected,
                got: tx.body.nonce,
            });
        }

        let mut spend = tx.body.fee;
        if kind == Some(PayloadKind::Transfer) {
            // A malformed amount is rejected at execution, after the fee is taken.
            if let Ok(amount) = tx
                .decode_payload::<Transfer>()
                .and_then(|t| parse_amount(&t.amount))
            {
                spend = spend.saturating_add(amount);
            }
        }

        inner.accounts.insert(
            tx.sender.clone(),
            Shadow {
                nonce: tx.body.nonce,
                balance: shadow.balance.saturating_sub(spend),
            },
        );
        inner.admitted.insert(tx_hash);
        Ok(())
    }

    /// Discards every shadow. Called once per commit.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.accounts.clear();
        inner.admitted.clear();
        mempool_metrics().set_shadow_accounts(0.0);
    }

    /// The current shadow for `sender`, if loaded.
    pub fn shadow(&self, sender: &[u8]) -> Option<Shadow> {
        self.inner.lock().accounts.get(sender).copied()
    }

    /// The number of shadowed accounts.
    pub fn len(&self) -> usize {
        self.inner.lock().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
