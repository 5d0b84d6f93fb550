// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the Strata node.
//!
//! Both files are TOML. Every optional field has a serde default so a minimal
//! config only needs the chain id.

use crate::app::account::Validator;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Chain-wide parameters that affect consensus results.
///
/// Every node of a network must run with identical values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Blocks a validator join request stays open for votes.
    #[serde(default = "default_join_vote_expiration")]
    pub join_vote_expiration: u64,
    /// Blocks a resolution stays open for votes.
    #[serde(default = "default_vote_expiry")]
    pub vote_expiry: u64,
    /// The maximum ids or bodies in one vote transaction.
    #[serde(default = "default_max_votes_per_tx")]
    pub max_votes_per_tx: u64,
    /// The byte budget for a proposed block's transactions.
    #[serde(default = "default_max_block_bytes")]
    pub max_block_bytes: u64,
}

fn default_join_vote_expiration() -> u64 {
    14_400
}
fn default_vote_expiry() -> u64 {
    14_400
}
fn default_max_votes_per_tx() -> u64 {
    200
}
fn default_max_block_bytes() -> u64 {
    6 * 1024 * 1024
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            join_vote_expiration: default_join_vote_expiration(),
            vote_expiry: default_vote_expiry(),
            max_votes_per_tx: default_max_votes_per_tx(),
            max_block_bytes: default_max_block_bytes(),
        }
    }
}

/// Snapshot creation and retention.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Whether this node creates snapshots.
    #[serde(default)]
    pub enabled: bool,
    /// Create a snapshot every this many heights.
    #[serde(default = "default_snapshot_interval")]
    pub interval: u64,
    /// Snapshots to keep; the oldest is removed when a new one exceeds it.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
    /// Target chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_snapshot_interval() -> u64 {
    14_400
}
fn default_max_snapshots() -> usize {
    3
}
fn default_chunk_size() -> usize {
    4 * 1024 * 1024
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_snapshot_interval(),
            max_snapshots: default_max_snapshots(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// The node's configuration file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// The chain this node serves.
    pub chain_id: String,
    /// Directory holding the database and snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Path to the hex-encoded ed25519 private key.
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,
    /// Whether transactions are priced. When false every price is 0.
    #[serde(default)]
    pub gas_enabled: bool,
    /// Listen address of the metrics server. Empty disables it.
    #[serde(default = "default_telemetry_addr")]
    pub telemetry_addr: String,
    /// Snapshot settings.
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    /// Consensus parameters.
    #[serde(default)]
    pub consensus: ConsensusParams,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_private_key_path() -> PathBuf {
    PathBuf::from("node_key.hex")
}
fn default_telemetry_addr() -> String {
    "127.0.0.1:9615".to_string()
}

impl NodeConfig {
    /// A config with defaults for every optional field.
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            data_dir: default_data_dir(),
            private_key_path: default_private_key_path(),
            gas_enabled: false,
            telemetry_addr: default_telemetry_addr(),
            snapshots: SnapshotConfig::default(),
            consensus: ConsensusParams::default(),
        }
    }

    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {}", path.display(), e)))?;
        let cfg: Self = toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("parse {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chain_id.is_empty() {
            return Err(AppError::Config("chain_id must not be empty".into()));
        }
        if self.consensus.max_votes_per_tx == 0 {
            return Err(AppError::Config("max_votes_per_tx must be > 0".into()));
        }
        if self.snapshots.enabled {
            if self.snapshots.interval == 0 {
                return Err(AppError::Config("snapshot interval must be > 0".into()));
            }
            if self.snapshots.max_snapshots == 0 || self.snapshots.chunk_size == 0 {
                return Err(AppError::Config(
                    "max_snapshots and chunk_size must be > 0".into(),
                ));
            }
        }
        Ok(())
    }
}

/// The genesis file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GenesisConfig {
    /// The chain id.
    pub chain_id: String,
    /// The height of the first block.
    #[serde(default = "default_initial_height")]
    pub initial_height: u64,
    /// Initial balances: hex identity to base-10 amount.
    #[serde(default)]
    pub allocations: BTreeMap<String, String>,
    /// Initial validators.
    #[serde(default)]
    pub validators: Vec<Validator>,
    /// The hex-encoded digest the chain starts from. Empty means 32 zero bytes.
    #[serde(default)]
    pub app_hash: String,
}

fn default_initial_height() -> u64 {
    1
}

impl GenesisConfig {
    /// A genesis with no allocations or validators.
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            initial_height: default_initial_height(),
            allocations: BTreeMap::new(),
            validators: Vec::new(),
            app_hash: String::new(),
        }
    }

    /// Loads a TOML genesis file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {}", path.display(), e)))?;
        toml::from_str(&text).map_err(|e| AppError::Config(format!("parse {}: {}", path.display(), e)))
    }

    /// Renders the genesis as TOML.
    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Decodes the allocations, in identity order.
    pub fn decoded_allocations(&self) -> Result<Vec<(Vec<u8>, u128)>, AppError> {
        self.allocations
            .iter()
            .map(|(id, amount)| {
                let identity = hex::decode(id.trim_start_matches("0x"))
                    .map_err(|e| AppError::Config(format!("allocation identity {}: {}", id, e)))?;
                let amount = amount
                    .parse::<u128>()
                    .map_err(|e| AppError::Config(format!("allocation amount {}: {}", amount, e)))?;
                Ok((identity, amount))
            })
            .collect()
    }

    /// Decodes the genesis digest.
    pub fn decoded_app_hash(&self) -> Result<[u8; 32], AppError> {
        if self.app_hash.is_empty() {
            return Ok([0u8; 32]);
        }
        let bytes = hex::decode(self.app_hash.trim_start_matches("0x"))
            .map_err(|e| AppError::Config(format!("genesis app_hash: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| AppError::Config("genesis app_hash must be 32 bytes".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_node_config_gets_defaults() {
        let cfg: NodeConfig = toml::from_str(r#"chain_id = "strata-1""#).unwrap();
        assert_eq!(cfg, NodeConfig::new("strata-1"));
        assert_eq!(cfg.consensus.max_votes_per_tx, 200);
        assert!(!cfg.gas_enabled);
        cfg.validate().unwrap();
    }

    #[test]
    fn node_config_roundtrips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = NodeConfig::new("strata-1");
        cfg.gas_enabled = true;
        cfg.snapshots.enabled = true;
        cfg.consensus.join_vote_expiration = 5;
        std::fs::write(&path, cfg.to_toml().unwrap()).unwrap();
        assert_eq!(NodeConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = NodeConfig::new("");
        assert!(cfg.validate().is_err());
        cfg.chain_id = "c".into();
        cfg.snapshots.enabled = true;
        cfg.snapshots.interval = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn genesis_allocations_decode() {
        let genesis: GenesisConfig = toml::from_str(
            r#"
            chain_id = "strata-1"
            [allocations]
            "0a0b" = "1000000000000000000000"
            [[validators]]
            pub_key = "01ff"
            power = 3
            "#,
        )
        .unwrap();
        assert_eq!(genesis.initial_height, 1);
        assert_eq!(
            genesis.decoded_allocations().unwrap(),
            vec![(vec![0x0a, 0x0b], 1_000_000_000_000_000_000_000u128)]
        );
        assert_eq!(genesis.validators[0].pub_key, vec![0x01, 0xff]);
        assert_eq!(genesis.decoded_app_hash().unwrap(), [0u8; 32]);

        let mut bad = genesis.clone();
        bad.allocations.insert("zz".into(), "1".into());
        assert!(bad.decoded_allocations().is_err());
    }
}
