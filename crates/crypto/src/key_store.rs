// Path: crates/crypto/src/key_store.rs
//! The node key file: a hex-encoded 32-byte ed25519 seed.

use crate::error::CryptoError;
use crate::sign::eddsa::Ed25519KeyPair;
use std::path::Path;

/// Reads a key pair from a hex seed file.
pub fn load_key(path: &Path) -> Result<Ed25519KeyPair, CryptoError> {
    let text = std::fs::read_to_string(path)?;
    let seed = hex::decode(text.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("{}: {}", path.display(), e)))?;
    Ed25519KeyPair::from_seed(&seed)
}

/// Writes a key pair's seed as hex, creating parent directories.
pub fn save_key(path: &Path, key: &Ed25519KeyPair) -> Result<(), CryptoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, hex::encode(key.seed()))?;
    Ok(())
}

/// Loads the key at `path`, generating and saving a new one if the file is absent.
pub fn load_or_generate(path: &Path) -> Result<Ed25519KeyPair, CryptoError> {
    if path.exists() {
        return load_key(path);
    }
    let key = Ed25519KeyPair::generate();
    save_key(path, &key)?;
    log::info!("generated new node key at {}", path.display());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("node_key.hex");
        let first = load_or_generate(&path).unwrap();
        let second = load_or_generate(&path).unwrap();
        assert_eq!(first.public_key(), second.public_key());

        std::fs::write(&path, "not hex").unwrap();
        assert!(matches!(load_key(&path), Err(CryptoError::InvalidKey(_))));
    }
}
