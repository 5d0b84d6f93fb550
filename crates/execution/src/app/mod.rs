// Path: crates/execution/src/app/mod.rs

//! The block executor: genesis, block execution and commit over a durable store.
//!
//! A block runs in one overlay over the committed state. Nothing reaches the
//! store until [`BlockExecutor::commit`], which writes the block's consensus
//! changes, the new chain status and the buffered local-event effects in a
//! single atomic batch.

pub mod end_block;

use ahash::AHashMap;
use parity_scale_codec::Encode;
use std::sync::Arc;
use strata_api::state::{StateAccess, StateChangeSet, StateOverlay, StateReadExt, StateWriteExt};
use strata_api::storage::{Column, KvStore, WriteBatch};
use strata_api::transaction::context::TxContext;
use strata_crypto::algorithms::hash::{sha256, sha256_parts, tx_hash, validator_address};
use strata_storage::{LocalEventStore, StoreView};
use strata_telemetry::sinks::execution_metrics;
use strata_telemetry::time::Timer;
use strata_tx::system::{accounts, voting};
use strata_tx::{LocalEffects, LocalOp, ResolutionRegistry, Router};
use strata_types::app::{
    ChainStatus, ExecTxResult, FinalizeBlockRequest, FinalizeBlockResponse, Transaction, Validator,
};
use strata_types::config::{ConsensusParams, GenesisConfig, NodeConfig};
use strata_types::error::{AppError, TxCode};
use strata_types::keys::{CHAIN_ID_KEY, CHAIN_STATUS_KEY};
use tokio::sync::watch;

pub use end_block::{process_votes, punish, validator_diff, VoteOutcome};

/// Settings the executor needs from the node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub chain_id: String,
    pub gas_enabled: bool,
    pub params: ConsensusParams,
    /// This node's validator public key, used for local-event bookkeeping.
    pub local_identity: Vec<u8>,
}

impl ExecutorConfig {
    pub fn from_node(cfg: &NodeConfig, local_identity: Vec<u8>) -> Self {
        Self {
            chain_id: cfg.chain_id.clone(),
            gas_enabled: cfg.gas_enabled,
            params: cfg.consensus.clone(),
            local_identity,
        }
    }
}

/// A finalized block waiting for commit.
struct PendingBlock {
    batch: WriteBatch,
    effects: LocalEffects,
    status: ChainStatus,
    validator_updates: Vec<Validator>,
    tx_hashes: Vec<[u8; 32]>,
}

/// What a commit persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub status: ChainStatus,
    /// Hashes of the transactions the block executed.
    pub tx_hashes: Vec<[u8; 32]>,
}

/// Executes blocks against a [`KvStore`].
pub struct BlockExecutor {
    store: Arc<dyn KvStore>,
    view: StoreView<dyn KvStore>,
    local_events: LocalEventStore,
    router: Router,
    resolutions: ResolutionRegistry,
    config: ExecutorConfig,
    status: ChainStatus,
    /// Validator address to public key, for attributing misbehaviour and
    /// resolving the proposer.
    addresses: AHashMap<Vec<u8>, Vec<u8>>,
    pending: Option<PendingBlock>,
}

impl BlockExecutor {
    /// Opens the executor over `store`, resuming from its last committed status.
    pub fn new(
        store: Arc<dyn KvStore>,
        router: Router,
        resolutions: ResolutionRegistry,
        config: ExecutorConfig,
    ) -> Result<Self, AppError> {
        let view = StoreView::new(Arc::clone(&store));
        let status = view
            .get_decoded::<ChainStatus>(CHAIN_STATUS_KEY)?
            .unwrap_or_default();
        let mut executor = Self {
            local_events: LocalEventStore::new(Arc::clone(&store)),
            store,
            view,
            router,
            resolutions,
            config,
            status,
            addresses: AHashMap::new(),
            pending: None,
        };
        executor.reload_addresses()?;
        tracing::info!(
            target: "execution",
            height = executor.status.height,
            app_hash = %hex::encode(&executor.status.app_hash),
            "executor opened"
        );
        Ok(executor)
    }

    /// The last committed chain status.
    pub fn status(&self) -> &ChainStatus {
        &self.status
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// A read-only view of committed state.
    pub fn view(&self) -> &StoreView<dyn KvStore> {
        &self.view
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn local_events(&self) -> &LocalEventStore {
        &self.local_events
    }

    /// Whether genesis has been applied.
    pub fn is_initialized(&self) -> Result<bool, AppError> {
        Ok(self.view.get_decoded::<String>(CHAIN_ID_KEY)?.is_some())
    }

    /// The public key behind a validator address, if it is or was recently a
    /// validator.
    pub fn pub_key_for_address(&self, address: &[u8]) -> Option<&[u8]> {
        self.addresses.get(address).map(Vec::as_slice)
    }

    fn reload_addresses(&mut self) -> Result<(), AppError> {
        self.addresses.clear();
        for v in voting::validators(&self.view)? {
            self.addresses
                .insert(validator_address(&v.pub_key).to_vec(), v.pub_key);
        }
        Ok(())
    }

    /// Applies genesis and commits it. `engine_validators` are used when the
    /// genesis file names none. Returns the validator set.
    pub fn init_chain(
        &mut self,
        genesis: &GenesisConfig,
        engine_validators: &[Validator],
    ) -> Result<Vec<Validator>, AppError> {
        if self.is_initialized()? {
            return Err(AppError::Misuse("chain is already initialized".into()));
        }
        if genesis.chain_id != self.config.chain_id {
            return Err(AppError::Config(format!(
                "genesis chain id '{}' does not match '{}'",
                genesis.chain_id, self.config.chain_id
            )));
        }

        let mut state = StateOverlay::new(&self.view);
        for (identity, amount) in genesis.decoded_allocations()? {
            accounts::credit(&mut state, &identity, amount)?;
        }
        let validators = if genesis.validators.is_empty() {
            engine_validators
        } else {
            &genesis.validators
        };
        for v in validators {
            voting::set_validator_power(&mut state, &v.pub_key, v.power)?;
        }
        state.put_encoded(CHAIN_ID_KEY, &genesis.chain_id)?;
        let status = ChainStatus {
            height: genesis.initial_height.saturating_sub(1),
            app_hash: genesis.decoded_app_hash()?.to_vec(),
        };
        state.put_encoded(CHAIN_STATUS_KEY, &status)?;
        let validators = voting::validators(&state)?;

        let batch = consensus_batch(&state.into_ordered_batch());
        self.store
            .write_batch(batch)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        self.status = status;
        self.reload_addresses()?;
        tracing::info!(
            target: "execution",
            chain_id = %genesis.chain_id,
            initial_height = genesis.initial_height,
            validators = validators.len(),
            "genesis applied"
        );
        Ok(validators)
    }

    /// Executes a decided block without committing it.
    ///
    /// Returns [`AppError::Cancelled`] if `shutdown` fires midway; nothing of
    /// the block is kept in that case.
    pub fn execute_block(
        &mut self,
        req: &FinalizeBlockRequest,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<FinalizeBlockResponse, AppError> {
        if self.pending.is_some() {
            return Err(AppError::Misuse(
                "a finalized block is already waiting for commit".into(),
            ));
        }
        let expected = self.status.height + 1;
        if req.height != expected {
            return Err(AppError::Misuse(format!(
                "expected block {}, got {}",
                expected, req.height
            )));
        }
        let _timer = Timer::new(execution_metrics());

        let proposer = self
            .pub_key_for_address(&req.proposer_address)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let offenders: Vec<Vec<u8>> = req
            .misbehavior
            .iter()
            .filter_map(|m| {
                let key = self.pub_key_for_address(&m.validator_address);
                if key.is_none() {
                    tracing::debug!(
                        target: "execution",
                        address = %hex::encode(&m.validator_address),
                        "misbehaviour from unknown validator ignored"
                    );
                }
                key.map(<[u8]>::to_vec)
            })
            .collect();

        let mut block = StateOverlay::new(&self.view);
        let before = voting::validators(&block)?;
        end_block::punish(&mut block, &offenders)?;

        let mut effects = LocalEffects::new();
        let mut tx_results = Vec::with_capacity(req.txs.len());
        let mut tx_hashes = Vec::with_capacity(req.txs.len());
        for raw in &req.txs {
            if *shutdown.borrow() {
                tracing::warn!(target: "execution", height = req.height, "block execution cancelled");
                return Err(AppError::Cancelled);
            }
            let hash = tx_hash(raw);
            tx_hashes.push(hash);
            let tx = match Transaction::from_wire(raw) {
                Ok(tx) => tx,
                Err(e) => {
                    execution_metrics().inc_tx_result(TxCode::EncodingError.label());
                    tx_results.push(ExecTxResult {
                        code: TxCode::EncodingError.as_u32(),
                        log: e.to_string(),
                        gas_used: 0,
                        events: Vec::new(),
                    });
                    continue;
                }
            };
            let ctx = TxContext {
                block_height: req.height,
                proposer: &proposer,
                chain_id: &self.config.chain_id,
                tx_hash: hash,
                gas_enabled: self.config.gas_enabled,
                local_identity: &self.config.local_identity,
                params: &self.config.params,
            };
            let response = self.router.execute(&ctx, &mut block, &tx, &mut effects)?;
            execution_metrics().inc_tx_result(response.code.label());
            tx_results.push(response.into_exec_result());
        }

        let outcome = process_votes(
            &mut block,
            &self.resolutions,
            req.height,
            self.config.gas_enabled,
        )?;
        for id in &outcome.processed {
            effects.delete(*id);
        }

        let after = voting::validators(&block)?;
        let validator_updates = validator_diff(&before, &after);

        let changes = block.into_ordered_batch();
        let app_hash = next_app_hash(&self.status.app_hash, &changes);
        let status = ChainStatus {
            height: req.height,
            app_hash: app_hash.to_vec(),
        };
        let mut batch = consensus_batch(&changes);
        batch.put(Column::Consensus, CHAIN_STATUS_KEY, status.encode());

        tracing::info!(
            target: "execution",
            height = req.height,
            txs = req.txs.len(),
            confirmed = outcome.confirmed.len(),
            expired = outcome.expired.len(),
            validator_updates = validator_updates.len(),
            app_hash = %hex::encode(app_hash),
            "block finalized"
        );
        execution_metrics().inc_blocks_finalized();

        self.pending = Some(PendingBlock {
            batch,
            effects,
            status,
            validator_updates: validator_updates.clone(),
            tx_hashes,
        });
        Ok(FinalizeBlockResponse {
            tx_results,
            validator_updates,
            app_hash: app_hash.to_vec(),
        })
    }

    /// Durably writes the finalized block.
    pub fn commit(&mut self) -> Result<CommitOutcome, AppError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| AppError::Misuse("commit without a finalized block".into()))?;
        let PendingBlock {
            mut batch,
            mut effects,
            status,
            validator_updates,
            tx_hashes,
        } = pending;

        for op in effects.drain() {
            match op {
                LocalOp::Delete(id) => LocalEventStore::queue_delete(&mut batch, &id),
                LocalOp::MarkReceived(id) => self
                    .local_events
                    .queue_mark_received(&mut batch, &id)
                    .map_err(|e| AppError::Storage(e.to_string()))?,
            }
        }
        self.store
            .write_batch(batch)
            .map_err(|e| AppError::Storage(e.to_string()))?;

        for v in &validator_updates {
            if v.power > 0 {
                self.addresses
                    .insert(validator_address(&v.pub_key).to_vec(), v.pub_key.clone());
            }
        }
        self.status = status;
        execution_metrics().set_committed_height(self.status.height);
        tracing::debug!(target: "execution", height = self.status.height, "block committed");
        Ok(CommitOutcome {
            status: self.status.clone(),
            tx_hashes,
        })
    }

    /// Drops a finalized block that will not be committed.
    pub fn discard_pending(&mut self) {
        self.pending = None;
    }

    /// Reloads status and lookups after the store was replaced underneath,
    /// as after a snapshot restore.
    pub fn reload(&mut self) -> Result<(), AppError> {
        self.pending = None;
        self.status = self
            .view
            .get_decoded::<ChainStatus>(CHAIN_STATUS_KEY)?
            .unwrap_or_default();
        self.reload_addresses()
    }
}

fn consensus_batch((inserts, deletes): &StateChangeSet) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for (key, value) in inserts {
        batch.put(Column::Consensus, key.clone(), value.clone());
    }
    for key in deletes {
        batch.delete(Column::Consensus, key.clone());
    }
    batch
}

/// Folds a block's ordered changes into the rolling application digest.
pub fn next_app_hash(prev: &[u8], changes: &StateChangeSet) -> [u8; 32] {
    let commitment = sha256(changes.encode());
    sha256_parts([prev, commitment.as_slice()])
}
