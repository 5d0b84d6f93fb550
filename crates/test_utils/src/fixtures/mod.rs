// Path: crates/test_utils/src/fixtures/mod.rs
//! Keys, signed transactions and votable events for tests.

use anyhow::Result;
use strata_crypto::sign::eddsa::Ed25519KeyPair;
use strata_crypto::sign::TxSigner;
use strata_types::app::{
    DeploySchema, Payload, Transaction, Transfer, VotableEvent, DEPOSIT_EVENT_TYPE,
};
use strata_types::vote_extension::DepositAttestation;

/// A deterministic key pair whose seed is `n` repeated.
pub fn key(n: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[n; 32]).unwrap_or_else(|_| Ed25519KeyPair::generate())
}

/// A `deposit` event crediting `amount` to `account`.
pub fn deposit_event(event_id: &str, account: &[u8], amount: u128) -> VotableEvent {
    VotableEvent {
        event_type: DEPOSIT_EVENT_TYPE.to_string(),
        body: DepositAttestation {
            event_id: event_id.to_string(),
            account: hex::encode(account),
            amount: amount.to_string(),
        }
        .encode(),
    }
}

/// Builds signed transactions for one chain with a fixed fee.
#[derive(Debug, Clone)]
pub struct TxFactory {
    pub chain_id: String,
    pub fee: u128,
}

impl TxFactory {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            fee: 0,
        }
    }

    pub fn with_fee(mut self, fee: u128) -> Self {
        self.fee = fee;
        self
    }

    pub fn signed<P: Payload>(
        &self,
        signer: &dyn TxSigner,
        payload: &P,
        nonce: u64,
    ) -> Transaction {
        let mut tx = Transaction::new_unsigned(payload, self.fee, nonce, self.chain_id.clone());
        signer.sign_transaction(&mut tx);
        tx
    }

    /// The wire bytes of a signed transaction.
    pub fn wire<P: Payload>(
        &self,
        signer: &dyn TxSigner,
        payload: &P,
        nonce: u64,
    ) -> Result<Vec<u8>> {
        Ok(self.signed(signer, payload, nonce).to_wire()?)
    }

    pub fn transfer(
        &self,
        signer: &dyn TxSigner,
        to: &[u8],
        amount: &str,
        nonce: u64,
    ) -> Result<Vec<u8>> {
        let payload = Transfer {
            to: to.to_vec(),
            amount: amount.to_string(),
        };
        self.wire(signer, &payload, nonce)
    }

    pub fn deploy(&self, signer: &dyn TxSigner, name: &str, nonce: u64) -> Result<Vec<u8>> {
        let payload = DeploySchema {
            name: name.to_string(),
            schema: format!("database {};", name).into_bytes(),
        };
        self.wire(signer, &payload, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_api::identity::Authenticator;
    use strata_crypto::sign::eddsa::Ed25519Authenticator;

    #[test]
    fn factory_signs_verifiable_transactions() {
        let alice = key(2);
        let factory = TxFactory::new("fixtures").with_fee(7);
        let raw = factory.transfer(&alice, &key(3).public_key(), "10", 4).unwrap();
        let tx = Transaction::from_wire(&raw).unwrap();
        assert_eq!(tx.body.fee, 7);
        assert_eq!(tx.body.nonce, 4);
        assert_eq!(tx.body.chain_id, "fixtures");
        Ed25519Authenticator
            .verify(&tx.sender, &tx.body.signing_bytes(), &tx.signature.signature)
            .unwrap();
    }

    #[test]
    fn deposit_events_carry_attestations() {
        let event = deposit_event("e-1", b"acct", 9);
        let attestation = DepositAttestation::decode(&event.body).unwrap();
        assert_eq!(attestation.account, hex::encode(b"acct"));
        assert_eq!(attestation.amount, "9");
        assert_eq!(key(5).public_key(), key(5).public_key());
    }
}
