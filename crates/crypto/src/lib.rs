// Path: crates/crypto/src/lib.rs
//! # Strata Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Strata Cryptography
//!
//! Ed25519 signing and verification, the ed25519 [`Authenticator`](strata_api::identity::Authenticator),
//! SHA-256 digests for transactions and the application digest, and the
//! on-disk node key.

pub mod algorithms;
pub mod error;
pub mod key_store;
pub mod sign;
