// Path: crates/api/src/identity/mod.rs

//! Defines the `Authenticator` trait and the registry keyed by signature type.

use std::collections::BTreeMap;
use std::sync::Arc;
use strata_types::error::AuthError;

/// Verifies signatures for one signature-type tag.
pub trait Authenticator: Send + Sync {
    /// Verifies `signature` over `message` for `identity`.
    fn verify(&self, identity: &[u8], message: &[u8], signature: &[u8]) -> Result<(), AuthError>;

    /// Renders `identity` as the caller string handed to the database engine.
    fn identifier(&self, identity: &[u8]) -> Result<String, AuthError>;
}

/// The set of authenticators, populated once at startup.
///
/// Lookups fail closed: an unregistered tag is `AuthenticatorNotFound`.
#[derive(Clone, Default)]
pub struct AuthRegistry {
    authenticators: BTreeMap<String, Arc<dyn Authenticator>>,
}

impl AuthRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `auth` for `sig_type`, replacing any previous entry.
    pub fn register(&mut self, sig_type: impl Into<String>, auth: Arc<dyn Authenticator>) {
        self.authenticators.insert(sig_type.into(), auth);
    }

    /// Builder form of [`AuthRegistry::register`].
    pub fn with(mut self, sig_type: impl Into<String>, auth: Arc<dyn Authenticator>) -> Self {
        self.register(sig_type, auth);
        self
    }

    fn lookup(&self, sig_type: &str) -> Result<&Arc<dyn Authenticator>, AuthError> {
        self.authenticators
            .get(sig_type)
            .ok_or_else(|| AuthError::AuthenticatorNotFound(sig_type.to_string()))
    }

    /// Verifies a signature with the authenticator for `sig_type`.
    pub fn verify(
        &self,
        sig_type: &str,
        identity: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), AuthError> {
        self.lookup(sig_type)?.verify(identity, message, signature)
    }

    /// Renders the caller identifier with the authenticator for `sig_type`.
    pub fn identifier(&self, sig_type: &str, identity: &[u8]) -> Result<String, AuthError> {
        self.lookup(sig_type)?.identifier(identity)
    }

    /// The registered signature types.
    pub fn sig_types(&self) -> impl Iterator<Item = &str> {
        self.authenticators.keys().map(String::as_str)
    }
}
