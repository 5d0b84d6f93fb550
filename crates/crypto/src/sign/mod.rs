// Path: crates/crypto/src/sign/mod.rs
//! Transaction signing.

pub mod eddsa;

use strata_types::app::{Transaction, TxSignature};

/// Something that can sign transaction bodies.
pub trait TxSigner: Send + Sync {
    /// The signature-type tag written to the transaction.
    fn sig_type(&self) -> &'static str;

    /// The identity written as the transaction sender.
    fn identity(&self) -> Vec<u8>;

    /// Signs `message`.
    fn sign_bytes(&self, message: &[u8]) -> Vec<u8>;

    /// Fills in the sender and signature of `tx`.
    fn sign_transaction(&self, tx: &mut Transaction) {
        tx.sender = self.identity();
        let sig = self.sign_bytes(&tx.body.signing_bytes());
        tx.signature = TxSignature {
            signature: sig,
            sig_type: self.sig_type().to_string(),
        };
    }
}
