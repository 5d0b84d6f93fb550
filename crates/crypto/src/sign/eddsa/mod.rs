// Path: crates/crypto/src/sign/eddsa/mod.rs
//! Ed25519 keys and the ed25519 authenticator.

use crate::error::CryptoError;
use crate::sign::TxSigner;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use strata_api::identity::Authenticator;
use strata_types::error::AuthError;

/// The signature-type tag for ed25519.
pub const ED25519_SIG_TYPE: &str = "ed25519";

/// An ed25519 key pair.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing: SigningKey,
}

impl Ed25519KeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = seed.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("seed must be 32 bytes, got {}", seed.len()))
        })?;
        Ok(Self {
            signing: SigningKey::from_bytes(&seed),
        })
    }

    /// The 32-byte seed.
    pub fn seed(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// The 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// Signs `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair({})", hex::encode(self.public_key()))
    }
}

impl TxSigner for Ed25519KeyPair {
    fn sig_type(&self) -> &'static str {
        ED25519_SIG_TYPE
    }

    fn identity(&self) -> Vec<u8> {
        self.public_key().to_vec()
    }

    fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.sign(message).to_vec()
    }
}

/// Verifies ed25519 signatures where the identity is the raw public key.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Authenticator;

impl Authenticator for Ed25519Authenticator {
    fn verify(&self, identity: &[u8], message: &[u8], signature: &[u8]) -> Result<(), AuthError> {
        let key_bytes: [u8; 32] = identity.try_into().map_err(|_| {
            AuthError::InvalidIdentity(format!("ed25519 key must be 32 bytes, got {}", identity.len()))
        })?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?;
        let sig = Signature::from_slice(signature)
            .map_err(|e| AuthError::MalformedSignature(e.to_string()))?;
        key.verify(message, &sig)
            .map_err(|_| AuthError::VerificationFailed)
    }

    fn identifier(&self, identity: &[u8]) -> Result<String, AuthError> {
        if identity.len() != 32 {
            return Err(AuthError::InvalidIdentity(format!(
                "ed25519 key must be 32 bytes, got {}",
                identity.len()
            )));
        }
        Ok(hex::encode(identity))
    }
}

#[cfg(test)]
mod tests;
