// Path: crates/crypto/src/algorithms/hash/tests.rs
use super::*;

#[test]
fn sha256_known_vector() {
    assert_eq!(
        hex::encode(sha256(b"abc")),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn parts_hash_like_concatenation() {
    assert_eq!(
        sha256_parts([b"ab".as_slice(), b"c".as_slice()]),
        sha256(b"abc")
    );
}

#[test]
fn address_is_digest_prefix() {
    let pk = [7u8; 32];
    assert_eq!(validator_address(&pk).as_slice(), &sha256(pk)[..20]);
}
