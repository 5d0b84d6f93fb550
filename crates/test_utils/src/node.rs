// Path: crates/test_utils/src/node.rs
//! An in-memory node that produces blocks as the sole proposer.

use crate::engine::RecordingEngine;
use crate::fixtures::{key, TxFactory};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use strata_api::consensus::ConsensusApplication;
use strata_api::identity::AuthRegistry;
use strata_api::storage::KvStore;
use strata_crypto::algorithms::hash::validator_address;
use strata_crypto::sign::eddsa::{Ed25519Authenticator, Ed25519KeyPair, ED25519_SIG_TYPE};
use strata_storage::MemoryStore;
use strata_types::app::{
    CheckTxKind, CheckTxRequest, FinalizeBlockRequest, FinalizeBlockResponse, InitChainRequest,
    Misbehavior, PrepareProposalRequest, ProcessProposalRequest, ProposalStatus, QueryRequest,
    Validator,
};
use strata_types::config::{ConsensusParams, GenesisConfig, NodeConfig};
use strata_validator::{AppParts, ConsensusApp};
use tempfile::TempDir;

pub const TEST_CHAIN_ID: &str = "strata-test";

/// Configures a [`TestNode`].
pub struct TestNodeBuilder {
    gas_enabled: bool,
    validators: Vec<(Ed25519KeyPair, u64)>,
    local: Option<Ed25519KeyPair>,
    allocations: Vec<(Vec<u8>, u128)>,
    params: ConsensusParams,
}

impl Default for TestNodeBuilder {
    fn default() -> Self {
        Self {
            gas_enabled: false,
            validators: vec![(key(1), 10)],
            local: None,
            allocations: Vec::new(),
            params: ConsensusParams::default(),
        }
    }
}

impl TestNodeBuilder {
    pub fn gas(mut self, enabled: bool) -> Self {
        self.gas_enabled = enabled;
        self
    }

    /// Replaces the validator set. The first validator is the local node.
    pub fn validators(mut self, validators: Vec<(Ed25519KeyPair, u64)>) -> Self {
        self.validators = validators;
        self
    }

    /// Runs the node as `key` instead of the first validator.
    pub fn local(mut self, key: Ed25519KeyPair) -> Self {
        self.local = Some(key);
        self
    }

    pub fn fund(mut self, identity: &[u8], amount: u128) -> Self {
        self.allocations.push((identity.to_vec(), amount));
        self
    }

    pub fn params(mut self, params: ConsensusParams) -> Self {
        self.params = params;
        self
    }

    pub async fn build(self) -> Result<TestNode> {
        let local = self
            .local
            .clone()
            .or_else(|| self.validators.first().map(|(k, _)| k.clone()))
            .ok_or_else(|| anyhow!("a test node needs at least one validator"))?;
        let dir = tempfile::tempdir()?;
        let mut node = NodeConfig::new(TEST_CHAIN_ID);
        node.data_dir = dir.path().to_path_buf();
        node.gas_enabled = self.gas_enabled;
        node.consensus = self.params;

        let mut genesis = GenesisConfig::new(TEST_CHAIN_ID);
        genesis.validators = self
            .validators
            .iter()
            .map(|(k, power)| Validator {
                pub_key: k.public_key().to_vec(),
                power: *power,
            })
            .collect();
        for (identity, amount) in &self.allocations {
            genesis
                .allocations
                .insert(hex::encode(identity), amount.to_string());
        }

        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let engine = Arc::new(RecordingEngine::new());
        let app = ConsensusApp::new(AppParts {
            store: Arc::clone(&store),
            engine: engine.clone(),
            auth: AuthRegistry::new().with(ED25519_SIG_TYPE, Arc::new(Ed25519Authenticator)),
            signer: Arc::new(local.clone()),
            node,
            genesis,
        })?;
        app.init_chain(InitChainRequest {
            chain_id: TEST_CHAIN_ID.to_string(),
            initial_height: 1,
            validators: Vec::new(),
        })
        .await?;

        Ok(TestNode {
            app,
            store,
            engine,
            local,
            height: 0,
            _dir: dir,
        })
    }
}

/// A consensus application over a [`MemoryStore`]. It proposes its own
/// blocks, or follows blocks another node proposed.
pub struct TestNode {
    pub app: ConsensusApp,
    pub store: Arc<dyn KvStore>,
    pub engine: Arc<RecordingEngine>,
    /// The local validator.
    pub local: Ed25519KeyPair,
    height: u64,
    _dir: TempDir,
}

impl TestNode {
    pub fn builder() -> TestNodeBuilder {
        TestNodeBuilder::default()
    }

    pub fn txs(&self) -> TxFactory {
        TxFactory::new(TEST_CHAIN_ID)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn local_address(&self) -> Vec<u8> {
        validator_address(&self.local.public_key()).to_vec()
    }

    /// Runs `txs` through CheckTx and returns this node's proposal for the
    /// next block. Transactions CheckTx rejects are left out, and the node's
    /// own pending vote ids lead the candidates.
    pub async fn propose(&self, txs: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
        let mut admitted: Vec<Vec<u8>> = self.app.take_vote_ids_tx().into_iter().collect();
        for tx in txs {
            let resp = self
                .app
                .check_tx(CheckTxRequest {
                    tx: tx.clone(),
                    kind: CheckTxKind::New,
                })
                .await?;
            if resp.code == 0 {
                admitted.push(tx);
            }
        }
        let proposal = self
            .app
            .prepare_proposal(PrepareProposalRequest {
                txs: admitted,
                max_tx_bytes: 0,
                height: self.height + 1,
                proposer_address: self.local_address(),
            })
            .await?;
        Ok(proposal.txs)
    }

    /// Proposes, validates, finalizes and commits the next block.
    pub async fn produce_block(&mut self, txs: Vec<Vec<u8>>) -> Result<FinalizeBlockResponse> {
        let block = self.propose(txs).await?;
        self.decide(block, Vec::new()).await
    }

    /// Validates, finalizes and commits exactly `txs` as the next block.
    pub async fn decide(
        &mut self,
        txs: Vec<Vec<u8>>,
        misbehavior: Vec<Misbehavior>,
    ) -> Result<FinalizeBlockResponse> {
        let proposer = self.local_address();
        self.apply(txs, misbehavior, proposer).await
    }

    /// Validates, finalizes and commits `txs` as proposed by the validator at
    /// `proposer_address`.
    pub async fn follow(
        &mut self,
        txs: Vec<Vec<u8>>,
        proposer_address: Vec<u8>,
    ) -> Result<FinalizeBlockResponse> {
        self.apply(txs, Vec::new(), proposer_address).await
    }

    async fn apply(
        &mut self,
        txs: Vec<Vec<u8>>,
        misbehavior: Vec<Misbehavior>,
        proposer_address: Vec<u8>,
    ) -> Result<FinalizeBlockResponse> {
        let height = self.height + 1;
        let status = self
            .app
            .process_proposal(ProcessProposalRequest {
                txs: txs.clone(),
                height,
                proposer_address: proposer_address.clone(),
            })
            .await?;
        if status != ProposalStatus::Accept {
            return Err(anyhow!("block {} was rejected by ProcessProposal", height));
        }
        let resp = self
            .app
            .finalize_block(FinalizeBlockRequest {
                txs,
                misbehavior,
                height,
                proposer_address,
            })
            .await?;
        self.app.commit().await?;
        self.height = height;
        Ok(resp)
    }

    /// Answers a query and parses the JSON value.
    pub async fn query_json(&self, path: &str) -> Result<serde_json::Value> {
        let resp = self
            .app
            .query(QueryRequest {
                path: path.to_string(),
            })
            .await?;
        if resp.code != 0 {
            return Err(anyhow!("query '{}' failed: {}", path, resp.log));
        }
        Ok(serde_json::from_slice(&resp.value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::deposit_event;
    use strata_types::app::ValidatorLeave;

    #[tokio::test]
    async fn produces_blocks_and_skips_rejected_txs() {
        let alice = key(2);
        let mut node = TestNode::builder()
            .fund(&alice.public_key(), 1_000)
            .build()
            .await
            .unwrap();
        let txs = node.txs();
        let good = txs.transfer(&alice, &key(3).public_key(), "10", 1).unwrap();
        let gap = txs.transfer(&alice, &key(3).public_key(), "10", 5).unwrap();
        let resp = node.produce_block(vec![good, gap]).await.unwrap();
        assert_eq!(resp.tx_results.len(), 1);
        crate::assert_block_ok!(resp);
        assert_eq!(node.height(), 1);

        let account = node
            .query_json(&format!("account/{}", hex::encode(key(3).public_key())))
            .await
            .unwrap();
        assert_eq!(account["balance"], "10");
    }

    #[tokio::test]
    async fn local_events_are_injected_and_confirmed() {
        let alice = key(2);
        let mut node = TestNode::builder().build().await.unwrap();
        node.app
            .observe_event(deposit_event("d-1", &alice.public_key(), 77))
            .unwrap();
        let resp = node.produce_block(Vec::new()).await.unwrap();
        assert_eq!(resp.tx_results.len(), 1);
        crate::assert_block_ok!(resp);
        let account = node
            .query_json(&format!("account/{}", hex::encode(alice.public_key())))
            .await
            .unwrap();
        assert_eq!(account["balance"], "77");
    }

    #[tokio::test]
    async fn rejected_proposals_surface_as_errors() {
        let mut node = TestNode::builder().build().await.unwrap();
        let stranger = key(8);
        // Nonce 2 leaves a gap after the account nonce.
        let raw = node.txs().wire(&stranger, &ValidatorLeave {}, 2).unwrap();
        assert!(node.decide(vec![raw], Vec::new()).await.is_err());
        assert_eq!(node.height(), 0);
    }
}
