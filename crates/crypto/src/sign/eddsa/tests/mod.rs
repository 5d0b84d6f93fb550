// Path: crates/crypto/src/sign/eddsa/tests/mod.rs
use super::*;
use std::sync::Arc;
use strata_api::identity::AuthRegistry;
use strata_types::app::{Transaction, Transfer};

#[test]
fn sign_and_verify() {
    let kp = Ed25519KeyPair::generate();
    let sig = kp.sign(b"hello");
    let auth = Ed25519Authenticator;
    auth.verify(&kp.public_key(), b"hello", &sig).unwrap();
    assert_eq!(
        auth.verify(&kp.public_key(), b"hellO", &sig),
        Err(AuthError::VerificationFailed)
    );
}

#[test]
fn malformed_inputs_are_errors_not_panics() {
    let kp = Ed25519KeyPair::generate();
    let auth = Ed25519Authenticator;
    assert!(matches!(
        auth.verify(&[1, 2, 3], b"m", &kp.sign(b"m")),
        Err(AuthError::InvalidIdentity(_))
    ));
    assert!(matches!(
        auth.verify(&kp.public_key(), b"m", &[0u8; 10]),
        Err(AuthError::MalformedSignature(_))
    ));
}

#[test]
fn seed_roundtrip_keeps_identity() {
    let kp = Ed25519KeyPair::generate();
    let again = Ed25519KeyPair::from_seed(&kp.seed()).unwrap();
    assert_eq!(kp.public_key(), again.public_key());
    assert!(Ed25519KeyPair::from_seed(&[0u8; 31]).is_err());
}

#[test]
fn signed_transaction_verifies_through_registry() {
    let kp = Ed25519KeyPair::from_seed(&[3u8; 32]).unwrap();
    let mut tx = Transaction::new_unsigned(
        &Transfer {
            to: vec![1; 32],
            amount: "5".into(),
        },
        0,
        1,
        "strata-test",
    );
    kp.sign_transaction(&mut tx);
    assert!(tx.is_signed());

    let registry = AuthRegistry::new().with(ED25519_SIG_TYPE, Arc::new(Ed25519Authenticator));
    registry
        .verify(
            &tx.signature.sig_type,
            &tx.sender,
            &tx.body.signing_bytes(),
            &tx.signature.signature,
        )
        .unwrap();

    tx.body.nonce = 2;
    assert!(registry
        .verify(
            &tx.signature.sig_type,
            &tx.sender,
            &tx.body.signing_bytes(),
            &tx.signature.signature
        )
        .is_err());
}
