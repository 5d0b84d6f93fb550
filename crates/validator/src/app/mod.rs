// Path: crates/validator/src/app/mod.rs

//! The consensus application: the object the external BFT engine drives.
//!
//! Admission (`check_tx`) runs against committed state and the mempool
//! shadow only, so it never waits on the executor lock held by block
//! execution. Everything on the consensus connection (proposals, finalize,
//! commit) goes through the [`BlockExecutor`] behind an async mutex.
//! Each commit ends by preparing this validator's vote-ids transaction,
//! which the node collects with [`ConsensusApp::take_vote_ids_tx`].

pub mod broadcast;
pub mod proposal;
pub mod query;
pub mod sig_cache;
pub mod state_sync;

use async_trait::async_trait;
use std::sync::Arc;
use strata_api::consensus::ConsensusApplication;
use strata_api::engine::DatabaseEngine;
use strata_api::identity::AuthRegistry;
use strata_api::storage::KvStore;
use strata_crypto::algorithms::hash::tx_hash;
use strata_crypto::sign::TxSigner;
use strata_execution::{BlockExecutor, ExecutorConfig};
use strata_storage::{LocalEventStore, StoreView};
use strata_tx::pricing::{per_unit, VOTE_BODY_BYTE_PRICE, VOTE_ID_PRICE};
use strata_tx::system::{accounts, voting};
use strata_tx::{MempoolCache, ResolutionRegistry, Router};
use strata_types::app::{
    ApplySnapshotChunkRequest, ApplySnapshotChunkResponse, ApplySnapshotChunkResult,
    CheckTxKind, CheckTxRequest, CheckTxResponse, CommitResponse, ExtendVoteRequest,
    ExtendVoteResponse, FinalizeBlockRequest, FinalizeBlockResponse, InfoResponse,
    InitChainRequest, InitChainResponse, LoadSnapshotChunkRequest, OfferSnapshotRequest,
    OfferSnapshotResult, PrepareProposalRequest, PrepareProposalResponse, ProcessProposalRequest,
    ProposalStatus, QueryRequest, QueryResponse, ResolutionId, Snapshot, Transaction,
    ValidatorVoteBodies, ValidatorVoteIds, VerifyStatus, VerifyVoteExtensionRequest, VotableEvent,
    DEPOSIT_EVENT_TYPE,
};
use strata_types::config::{GenesisConfig, NodeConfig};
use strata_telemetry::error_metrics;
use strata_types::error::{AppError, ErrorCode, SnapshotError, TransactionError};
use strata_types::vote_extension::{
    decode_typed_segments, decode_vote_extension, encode_vote_extension, DepositAttestation,
};
use tokio::sync::{watch, Mutex};

use broadcast::Outbox;
use proposal::ProposalRules;
use sig_cache::VerifiedSignatures;
use state_sync::StateSync;

/// Reported to the engine in `info`.
pub const APP_VERSION: u64 = 1;

/// The most locally observed events a proposer submits in one block.
pub const MAX_INJECTED_EVENTS: usize = 50;

fn record<T>(result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(e) = &result {
        error_metrics().inc_error("consensus_app", e.code());
    }
    result
}

/// Everything needed to assemble a [`ConsensusApp`].
pub struct AppParts {
    pub store: Arc<dyn KvStore>,
    pub engine: Arc<dyn DatabaseEngine>,
    pub auth: AuthRegistry,
    /// Signs proposer-injected transactions. Its identity is this node's
    /// validator key.
    pub signer: Arc<dyn TxSigner>,
    pub node: NodeConfig,
    pub genesis: GenesisConfig,
}

/// The consensus application.
pub struct ConsensusApp {
    executor: Mutex<BlockExecutor>,
    store: Arc<dyn KvStore>,
    view: StoreView<dyn KvStore>,
    local_events: LocalEventStore,
    router: Router,
    auth: AuthRegistry,
    signer: Arc<dyn TxSigner>,
    genesis: GenesisConfig,
    config: ExecutorConfig,
    mempool: MempoolCache,
    verified: VerifiedSignatures,
    state_sync: StateSync,
    outbox: Outbox,
    shutdown: watch::Sender<bool>,
}

impl ConsensusApp {
    pub fn new(parts: AppParts) -> Result<Self, AppError> {
        let AppParts {
            store,
            engine,
            auth,
            signer,
            node,
            genesis,
        } = parts;
        node.validate()?;
        let config = ExecutorConfig::from_node(&node, signer.identity());
        let resolutions = ResolutionRegistry::with_defaults(&config.params);
        let router = Router::standard(engine, auth.clone(), resolutions.clone());
        let executor = BlockExecutor::new(
            Arc::clone(&store),
            router.clone(),
            resolutions,
            config.clone(),
        )?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            executor: Mutex::new(executor),
            view: StoreView::new(Arc::clone(&store)),
            local_events: LocalEventStore::new(Arc::clone(&store)),
            store,
            router,
            auth,
            signer,
            genesis,
            state_sync: StateSync::new(node.data_dir.join("snapshots"), &node.snapshots),
            config,
            mempool: MempoolCache::new(),
            verified: VerifiedSignatures::default(),
            outbox: Outbox::default(),
            shutdown,
        })
    }

    /// Aborts any block currently executing; the block is not committed.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Records an event observed by this node's listeners.
    pub fn observe_event(&self, event: VotableEvent) -> Result<ResolutionId, AppError> {
        self.local_events
            .observe(event)
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn mempool(&self) -> &MempoolCache {
        &self.mempool
    }

    /// The vote-ids transaction prepared at the last commit, already admitted
    /// to the local mempool. The caller forwards it to the engine.
    pub fn take_vote_ids_tx(&self) -> Option<Vec<u8>> {
        self.outbox.take()
    }

    fn rules(&self) -> ProposalRules<'_> {
        ProposalRules {
            chain_id: &self.config.chain_id,
            gas_enabled: self.config.gas_enabled,
            max_votes_per_tx: self.config.params.max_votes_per_tx,
        }
    }

    fn admit(&self, req: &CheckTxRequest) -> Result<(), TransactionError> {
        let tx = Transaction::from_wire(&req.tx)?;
        let hash = tx_hash(&req.tx);
        if req.kind == CheckTxKind::New {
            let chain_id = &tx.body.chain_id;
            if !chain_id.is_empty() && *chain_id != self.config.chain_id {
                return Err(TransactionError::WrongChain {
                    expected: self.config.chain_id.clone(),
                    got: chain_id.clone(),
                });
            }
            if !self.router.handles(&tx.body.payload_type) {
                return Err(TransactionError::UnknownPayloadType(
                    tx.body.payload_type.clone(),
                ));
            }
            self.auth.verify(
                &tx.signature.sig_type,
                &tx.sender,
                &tx.body.signing_bytes(),
                &tx.signature.signature,
            )?;
            self.verified.insert(hash);
        }
        self.mempool
            .admit(&self.view, &tx, hash, self.config.gas_enabled)
    }

    /// Local events still lacking a body on chain, capped per block.
    fn pending_local_events(&self) -> Result<Vec<VotableEvent>, AppError> {
        let limit = usize::try_from(self.config.params.max_votes_per_tx)
            .unwrap_or(usize::MAX)
            .min(MAX_INJECTED_EVENTS);
        let mut events = Vec::new();
        let all = self
            .local_events
            .all()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        for (id, local) in all {
            if events.len() >= limit {
                break;
            }
            if voting::is_processed(&self.view, &id)? {
                continue;
            }
            let has_body = voting::get_resolution(&self.view, &id)?
                .is_some_and(|r| r.event.is_some());
            if !has_body {
                events.push(local.event);
            }
        }
        Ok(events)
    }

    /// Builds and signs the proposer's vote-bodies transaction, if there is
    /// anything to submit.
    fn vote_bodies_tx(&self, nonce: u64) -> Result<Option<Vec<u8>>, AppError> {
        let events = self.pending_local_events()?;
        if events.is_empty() {
            return Ok(None);
        }
        let payload = ValidatorVoteBodies { events };
        let fee = if self.config.gas_enabled {
            per_unit(VOTE_BODY_BYTE_PRICE, payload.body_bytes())
        } else {
            0
        };
        let mut tx = Transaction::new_unsigned(&payload, fee, nonce, self.config.chain_id.clone());
        self.signer.sign_transaction(&mut tx);
        let raw = tx.to_wire().map_err(|e| AppError::Codec(e.to_string()))?;
        tracing::debug!(
            target: "consensus_app",
            events = payload.events.len(),
            nonce,
            "injecting vote bodies"
        );
        Ok(Some(raw))
    }

    /// Builds, signs and admits this validator's approvals for local events
    /// it has not yet seen on chain.
    fn vote_ids_tx(&self) -> Result<Option<Vec<u8>>, AppError> {
        let identity = self.config.local_identity.as_slice();
        if voting::validator_power(&self.view, identity)? == 0 {
            return Ok(None);
        }
        let limit = usize::try_from(self.config.params.max_votes_per_tx).unwrap_or(usize::MAX);
        let resolution_ids = broadcast::unreceived_ids(&self.view, &self.local_events, limit)?;
        if resolution_ids.is_empty() {
            return Ok(None);
        }

        let account = accounts::get_account(&self.view, identity)?;
        let fee = if self.config.gas_enabled {
            per_unit(VOTE_ID_PRICE, resolution_ids.len())
        } else {
            0
        };
        if account.balance < fee {
            tracing::warn!(
                target: "consensus_app",
                balance = %account.balance,
                fee = %fee,
                "skipping vote ids, balance does not cover the fee"
            );
            return Ok(None);
        }

        let payload = ValidatorVoteIds { resolution_ids };
        let nonce = account.nonce.saturating_add(1);
        let mut tx = Transaction::new_unsigned(&payload, fee, nonce, self.config.chain_id.clone());
        self.signer.sign_transaction(&mut tx);
        let raw = tx.to_wire().map_err(|e| AppError::Codec(e.to_string()))?;
        let hash = tx_hash(&raw);
        if let Err(e) = self.mempool.admit(&self.view, &tx, hash, self.config.gas_enabled) {
            tracing::warn!(target: "consensus_app", nonce, error = %e, "vote ids not admitted");
            return Ok(None);
        }
        self.verified.insert(hash);
        tracing::debug!(
            target: "consensus_app",
            ids = payload.resolution_ids.len(),
            nonce,
            "broadcasting vote ids"
        );
        Ok(Some(raw))
    }

    fn deposit_attestations(&self) -> Result<Vec<DepositAttestation>, AppError> {
        let mut out = Vec::new();
        let all = self
            .local_events
            .all()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        for (id, local) in all {
            if local.event.event_type != DEPOSIT_EVENT_TYPE || voting::is_processed(&self.view, &id)? {
                continue;
            }
            match DepositAttestation::decode(&local.event.body) {
                Ok(deposit) => out.push(deposit),
                Err(e) => {
                    tracing::warn!(target: "consensus_app", id = %id, error = %e, "skipping malformed local deposit")
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ConsensusApplication for ConsensusApp {
    async fn check_tx(&self, req: CheckTxRequest) -> Result<CheckTxResponse, AppError> {
        match self.admit(&req) {
            Ok(()) => Ok(CheckTxResponse::ok()),
            Err(e) => {
                tracing::debug!(target: "consensus_app", kind = ?req.kind, error = %e, "transaction rejected");
                Ok(CheckTxResponse::reject(e.tx_code(), e.to_string()))
            }
        }
    }

    async fn prepare_proposal(
        &self,
        req: PrepareProposalRequest,
    ) -> Result<PrepareProposalResponse, AppError> {
        let proposer = {
            let exec = self.executor.lock().await;
            exec.pub_key_for_address(&req.proposer_address)
                .map(<[u8]>::to_vec)
        };
        let Some(proposer) = proposer else {
            tracing::warn!(target: "consensus_app", height = req.height, "proposer is not a validator, proposing an empty block");
            return Ok(PrepareProposalResponse { txs: Vec::new() });
        };

        let assembly = match proposal::assemble(&self.view, &req.txs, &proposer, self.rules()) {
            Ok(assembly) => assembly,
            Err(e) => {
                tracing::error!(target: "consensus_app", error = %e, "proposal assembly failed");
                return Ok(PrepareProposalResponse { txs: Vec::new() });
            }
        };
        let injected = if proposer == self.config.local_identity {
            self.vote_bodies_tx(assembly.next_proposer_nonce)?
        } else {
            None
        };
        let max_block_bytes = self.config.params.max_block_bytes;
        let budget = match req.max_tx_bytes {
            0 => max_block_bytes,
            n => n.min(max_block_bytes),
        };
        let txs = proposal::fill(assembly, injected, budget);
        if txs.len() != req.txs.len() {
            tracing::info!(
                target: "consensus_app",
                height = req.height,
                candidates = req.txs.len(),
                proposed = txs.len(),
                "proposal changed the candidate count"
            );
        }
        Ok(PrepareProposalResponse { txs })
    }

    async fn process_proposal(
        &self,
        req: ProcessProposalRequest,
    ) -> Result<ProposalStatus, AppError> {
        let proposer = {
            let exec = self.executor.lock().await;
            exec.pub_key_for_address(&req.proposer_address)
                .map(<[u8]>::to_vec)
        };
        let Some(proposer) = proposer else {
            if req.txs.is_empty() {
                return Ok(ProposalStatus::Accept);
            }
            tracing::warn!(target: "consensus_app", height = req.height, "non-empty proposal from a non-validator");
            return Ok(ProposalStatus::Reject);
        };
        match proposal::validate(
            &self.view,
            &req.txs,
            &proposer,
            self.rules(),
            &self.auth,
            &self.verified,
        ) {
            Ok(()) => Ok(ProposalStatus::Accept),
            Err(e) => {
                tracing::warn!(target: "consensus_app", height = req.height, error = %e, "rejecting proposal");
                Ok(ProposalStatus::Reject)
            }
        }
    }

    async fn finalize_block(
        &self,
        req: FinalizeBlockRequest,
    ) -> Result<FinalizeBlockResponse, AppError> {
        let mut exec = self.executor.lock().await;
        let shutdown = self.shutdown.subscribe();
        let resp = record(exec.execute_block(&req, &shutdown))?;
        let hashes: Vec<[u8; 32]> = req.txs.iter().map(|raw| tx_hash(raw)).collect();
        self.verified.evict(hashes.iter());
        Ok(resp)
    }

    async fn commit(&self) -> Result<CommitResponse, AppError> {
        let mut exec = self.executor.lock().await;
        let outcome = record(exec.commit())?;
        self.mempool.reset();
        if let Err(e) = self.state_sync.maybe_snapshot(self.store.as_ref(), &outcome.status) {
            tracing::warn!(target: "snapshot", height = outcome.status.height, error = %e, "snapshot failed");
        }
        let vote_ids = self.vote_ids_tx().unwrap_or_else(|e| {
            tracing::warn!(target: "consensus_app", height = outcome.status.height, error = %e, "vote ids not prepared");
            None
        });
        self.outbox.replace(vote_ids);
        Ok(CommitResponse { retain_height: 0 })
    }

    async fn info(&self) -> Result<InfoResponse, AppError> {
        let exec = self.executor.lock().await;
        let status = exec.status();
        Ok(InfoResponse {
            app_version: APP_VERSION,
            last_block_height: status.height,
            last_block_app_hash: status.app_hash.clone(),
        })
    }

    async fn init_chain(&self, req: InitChainRequest) -> Result<InitChainResponse, AppError> {
        let mut genesis = self.genesis.clone();
        if !req.chain_id.is_empty() && req.chain_id != genesis.chain_id {
            return Err(AppError::Config(format!(
                "engine chain id '{}' does not match genesis '{}'",
                req.chain_id, genesis.chain_id
            )));
        }
        if req.initial_height > 0 {
            genesis.initial_height = req.initial_height;
        }
        let mut exec = self.executor.lock().await;
        let validators = record(exec.init_chain(&genesis, &req.validators))?;
        Ok(InitChainResponse {
            validators,
            app_hash: exec.status().app_hash.clone(),
        })
    }

    async fn query(&self, req: QueryRequest) -> Result<QueryResponse, AppError> {
        Ok(query::answer(&self.view, &self.config.chain_id, &req.path))
    }

    async fn extend_vote(&self, req: ExtendVoteRequest) -> Result<ExtendVoteResponse, AppError> {
        let limit = usize::try_from(self.config.params.max_votes_per_tx).unwrap_or(usize::MAX);
        let segments: Vec<_> = self
            .deposit_attestations()?
            .iter()
            .take(limit)
            .map(DepositAttestation::to_segment)
            .collect();
        if segments.is_empty() {
            return Ok(ExtendVoteResponse::default());
        }
        tracing::debug!(target: "consensus_app", height = req.height, deposits = segments.len(), "extending vote");
        Ok(ExtendVoteResponse {
            vote_extension: encode_vote_extension(&segments),
        })
    }

    async fn verify_vote_extension(
        &self,
        req: VerifyVoteExtensionRequest,
    ) -> Result<VerifyStatus, AppError> {
        if req.vote_extension.is_empty() {
            return Ok(VerifyStatus::Accept);
        }
        let verdict = decode_vote_extension(&req.vote_extension)
            .and_then(|segments| decode_typed_segments(&segments));
        match verdict {
            Ok(_) => Ok(VerifyStatus::Accept),
            Err(e) => {
                tracing::warn!(
                    target: "consensus_app",
                    validator = %hex::encode(&req.validator_address),
                    error = %e,
                    "rejecting vote extension"
                );
                Ok(VerifyStatus::Reject)
            }
        }
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, AppError> {
        Ok(self.state_sync.list()?)
    }

    async fn load_snapshot_chunk(
        &self,
        req: LoadSnapshotChunkRequest,
    ) -> Result<Vec<u8>, AppError> {
        match self.state_sync.load_chunk(&req) {
            Ok(chunk) => Ok(chunk),
            Err(e) => {
                tracing::warn!(target: "snapshot", height = req.height, chunk = req.chunk, error = %e, "chunk unavailable");
                Ok(Vec::new())
            }
        }
    }

    async fn offer_snapshot(
        &self,
        req: OfferSnapshotRequest,
    ) -> Result<OfferSnapshotResult, AppError> {
        Ok(self.state_sync.offer(&req))
    }

    async fn apply_snapshot_chunk(
        &self,
        req: ApplySnapshotChunkRequest,
    ) -> Result<ApplySnapshotChunkResponse, AppError> {
        let mut exec = self.executor.lock().await;
        let (resp, restored) = match self.state_sync.apply_chunk(&req, self.store.as_ref()) {
            Ok(out) => out,
            Err(SnapshotError::NoRestoreInProgress) => {
                return Ok(ApplySnapshotChunkResponse {
                    result: ApplySnapshotChunkResult::Abort,
                    refetch_chunks: Vec::new(),
                    reject_senders: Vec::new(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let Some(restored) = restored else {
            return Ok(resp);
        };

        exec.reload()?;
        self.mempool.reset();
        self.outbox.replace(None);
        let status = exec.status();
        if status.height != restored.height || status.app_hash != restored.app_hash {
            tracing::error!(
                target: "snapshot",
                height = status.height,
                expected_height = restored.height,
                "restored state does not match the trusted app hash"
            );
            return Ok(ApplySnapshotChunkResponse {
                result: ApplySnapshotChunkResult::RejectSnapshot,
                refetch_chunks: Vec::new(),
                reject_senders: vec![req.sender],
            });
        }
        tracing::info!(target: "snapshot", height = status.height, "state sync complete");
        Ok(resp)
    }
}
