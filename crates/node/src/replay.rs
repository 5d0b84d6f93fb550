// Path: crates/node/src/replay.rs
//! Drives a single-validator chain from a JSON file of blocks.
//!
//! The file looks like:
//!
//! ```json
//! { "blocks": [ { "txs": ["<hex wire tx>"], "events": [ { "type": "deposit", "body": "<hex>" } ] } ] }
//! ```
//!
//! Events are recorded as locally observed before the block is proposed, so
//! the node submits their bodies itself.

use crate::engine::DatasetRegistry;
use crate::home::Loaded;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use strata_api::consensus::ConsensusApplication;
use strata_api::identity::AuthRegistry;
use strata_api::storage::KvStore;
use strata_crypto::algorithms::hash::validator_address;
use strata_crypto::sign::eddsa::{Ed25519Authenticator, ED25519_SIG_TYPE};
use strata_types::app::{
    CheckTxKind, CheckTxRequest, FinalizeBlockRequest, InitChainRequest, PrepareProposalRequest,
    ProcessProposalRequest, ProposalStatus, VotableEvent,
};
use strata_validator::{AppParts, ConsensusApp};

#[derive(Debug, Deserialize)]
pub struct BlockFile {
    pub blocks: Vec<BlockSpec>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockSpec {
    #[serde(default)]
    pub txs: Vec<String>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

#[derive(Debug, Deserialize)]
pub struct EventSpec {
    #[serde(rename = "type")]
    pub event_type: String,
    pub body: String,
}

/// The outcome of one replayed block.
#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub height: u64,
    pub app_hash: String,
    /// One result code per executed transaction.
    pub tx_codes: Vec<u32>,
    /// (index in the input, CheckTx code) for transactions left out.
    pub rejected: Vec<(usize, u32)>,
    pub validator_updates: usize,
}

impl BlockFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }
}

/// Builds the consensus application for a loaded home over `store`.
pub fn build_app(loaded: &Loaded, store: Arc<dyn KvStore>) -> Result<ConsensusApp> {
    let app = ConsensusApp::new(AppParts {
        store,
        engine: Arc::new(DatasetRegistry),
        auth: AuthRegistry::new().with(ED25519_SIG_TYPE, Arc::new(Ed25519Authenticator)),
        signer: Arc::new(loaded.key.clone()),
        node: loaded.config.clone(),
        genesis: loaded.genesis.clone(),
    })?;
    Ok(app)
}

pub struct Replayer<'a> {
    app: &'a ConsensusApp,
    proposer_address: Vec<u8>,
}

impl<'a> Replayer<'a> {
    pub fn new(app: &'a ConsensusApp, loaded: &Loaded) -> Self {
        Self {
            app,
            proposer_address: validator_address(&loaded.key.public_key()).to_vec(),
        }
    }

    /// Runs InitChain unless the store already holds a chain. Returns the last
    /// committed height.
    pub async fn ensure_initialized(&self, loaded: &Loaded) -> Result<u64> {
        let info = self.app.info().await?;
        if !info.last_block_app_hash.is_empty() {
            return Ok(info.last_block_height);
        }
        self.app
            .init_chain(InitChainRequest {
                chain_id: loaded.genesis.chain_id.clone(),
                initial_height: loaded.genesis.initial_height,
                validators: Vec::new(),
            })
            .await?;
        Ok(self.app.info().await?.last_block_height)
    }

    pub async fn run_block(&self, height: u64, spec: &BlockSpec) -> Result<BlockReport> {
        for event in &spec.events {
            let body = hex::decode(&event.body).context("event body")?;
            self.app.observe_event(VotableEvent {
                event_type: event.event_type.clone(),
                body,
            })?;
        }

        // Vote ids prepared at the previous commit are already admitted.
        let mut admitted: Vec<Vec<u8>> = self.app.take_vote_ids_tx().into_iter().collect();
        let mut rejected = Vec::new();
        for (i, tx) in spec.txs.iter().enumerate() {
            let raw = hex::decode(tx).with_context(|| format!("tx {} of block {}", i, height))?;
            let resp = self
                .app
                .check_tx(CheckTxRequest {
                    tx: raw.clone(),
                    kind: CheckTxKind::New,
                })
                .await?;
            if resp.code == 0 {
                admitted.push(raw);
            } else {
                tracing::warn!(target: "node", height, index = i, code = resp.code, log = %resp.log, "tx rejected by CheckTx");
                rejected.push((i, resp.code));
            }
        }

        let proposal = self
            .app
            .prepare_proposal(PrepareProposalRequest {
                txs: admitted,
                max_tx_bytes: 0,
                height,
                proposer_address: self.proposer_address.clone(),
            })
            .await?;
        let status = self
            .app
            .process_proposal(ProcessProposalRequest {
                txs: proposal.txs.clone(),
                height,
                proposer_address: self.proposer_address.clone(),
            })
            .await?;
        if status != ProposalStatus::Accept {
            return Err(anyhow!("own proposal at height {} was rejected", height));
        }
        let resp = self
            .app
            .finalize_block(FinalizeBlockRequest {
                txs: proposal.txs,
                misbehavior: Vec::new(),
                height,
                proposer_address: self.proposer_address.clone(),
            })
            .await?;
        self.app.commit().await?;

        Ok(BlockReport {
            height,
            app_hash: hex::encode(&resp.app_hash),
            tx_codes: resp.tx_results.iter().map(|r| r.code).collect(),
            rejected,
            validator_updates: resp.validator_updates.len(),
        })
    }

    /// Replays every block of `file` on top of the current chain.
    pub async fn run(&self, loaded: &Loaded, file: &BlockFile) -> Result<Vec<BlockReport>> {
        let mut height = self.ensure_initialized(loaded).await?;
        let mut reports = Vec::with_capacity(file.blocks.len());
        for spec in &file.blocks {
            height += 1;
            let report = self.run_block(height, spec).await?;
            tracing::info!(
                target: "node",
                height,
                txs = report.tx_codes.len(),
                app_hash = %report.app_hash,
                "block committed"
            );
            reports.push(report);
        }
        Ok(reports)
    }
}
