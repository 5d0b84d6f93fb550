// Path: crates/node/src/home.rs
//! The node home directory: config, genesis, key and data.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_api::state::StateReadExt;
use strata_api::storage::KvStore;
use strata_crypto::key_store;
use strata_crypto::sign::eddsa::Ed25519KeyPair;
use strata_storage::{RedbStore, StoreView};
use strata_types::app::{ChainStatus, Validator};
use strata_types::config::{GenesisConfig, NodeConfig, SnapshotConfig};
use strata_types::keys::{CHAIN_ID_KEY, CHAIN_STATUS_KEY};

pub const CONFIG_FILE: &str = "config.toml";
pub const GENESIS_FILE: &str = "genesis.toml";
pub const KEY_FILE: &str = "node_key.hex";
pub const DB_FILE: &str = "strata.redb";

/// Options for `strata-node init`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub chain_id: String,
    pub gas_enabled: bool,
    /// Voting power of this node in the genesis validator set.
    pub power: u64,
    /// Genesis balances as (hex identity, decimal amount).
    pub allocations: Vec<(String, String)>,
    pub snapshots: bool,
}

/// Everything loaded from a home directory, with paths resolved against it.
pub struct Loaded {
    pub config: NodeConfig,
    pub genesis: GenesisConfig,
    pub key: Ed25519KeyPair,
}

/// What `strata-node info` prints.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NodeInfo {
    pub chain_id: Option<String>,
    pub height: u64,
    pub app_hash: String,
    pub validator: String,
}

#[derive(Debug, Clone)]
pub struct Home {
    root: PathBuf,
}

impl Home {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn genesis_path(&self) -> PathBuf {
        self.root.join(GENESIS_FILE)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Writes a fresh config, genesis file and node key. The node is the sole
    /// genesis validator.
    pub fn init(&self, opts: &InitOptions) -> Result<Ed25519KeyPair> {
        if self.config_path().exists() {
            bail!("{} already exists", self.config_path().display());
        }
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("create {}", self.root.display()))?;

        let mut config = NodeConfig::new(opts.chain_id.clone());
        config.data_dir = PathBuf::from("data");
        config.private_key_path = PathBuf::from(KEY_FILE);
        config.gas_enabled = opts.gas_enabled;
        if opts.snapshots {
            config.snapshots = SnapshotConfig {
                enabled: true,
                ..SnapshotConfig::default()
            };
        }
        config.validate()?;

        let key = key_store::load_or_generate(&self.resolve(&config.private_key_path))
            .context("node key")?;

        let mut genesis = GenesisConfig::new(opts.chain_id.clone());
        genesis.validators.push(Validator {
            pub_key: key.public_key().to_vec(),
            power: opts.power,
        });
        for (identity, amount) in &opts.allocations {
            genesis.allocations.insert(identity.clone(), amount.clone());
        }
        genesis.decoded_allocations()?;

        std::fs::write(self.config_path(), config.to_toml()?)?;
        std::fs::write(self.genesis_path(), genesis.to_toml()?)?;
        tracing::info!(
            target: "node",
            home = %self.root.display(),
            chain_id = %opts.chain_id,
            validator = %hex::encode(key.public_key()),
            "initialized node home"
        );
        Ok(key)
    }

    pub fn load(&self) -> Result<Loaded> {
        let mut config = NodeConfig::load(&self.config_path())?;
        config.data_dir = self.resolve(&config.data_dir);
        config.private_key_path = self.resolve(&config.private_key_path);
        let genesis = GenesisConfig::load(&self.genesis_path())?;
        if genesis.chain_id != config.chain_id {
            return Err(anyhow!(
                "genesis chain id '{}' does not match config '{}'",
                genesis.chain_id,
                config.chain_id
            ));
        }
        let key = key_store::load_key(&config.private_key_path).context("node key")?;
        Ok(Loaded {
            config,
            genesis,
            key,
        })
    }

    /// Opens the node database, creating the data directory if needed.
    pub fn open_store(&self, config: &NodeConfig) -> Result<Arc<dyn KvStore>> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = RedbStore::open(config.data_dir.join(DB_FILE))?;
        Ok(Arc::new(store))
    }

    /// Reads the last committed status straight from the database.
    pub fn info(&self) -> Result<NodeInfo> {
        let loaded = self.load()?;
        let view = StoreView::new(self.open_store(&loaded.config)?);
        let status = view
            .get_decoded::<ChainStatus>(CHAIN_STATUS_KEY)?
            .unwrap_or_default();
        let chain_id = view.get_decoded::<String>(CHAIN_ID_KEY)?;
        Ok(NodeInfo {
            chain_id,
            height: status.height,
            app_hash: hex::encode(&status.app_hash),
            validator: hex::encode(loaded.key.public_key()),
        })
    }
}
