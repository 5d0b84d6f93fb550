// Path: crates/types/src/app/consensus.rs
//! Request and response types for the consensus-engine callback protocol.
//!
//! These mirror the callbacks an external BFT engine drives: admission,
//! proposal assembly and validation, block execution, commit, bootstrap,
//! queries, vote extensions and state sync.

use crate::app::account::Validator;
use crate::app::serde_util::hex_bytes;
use crate::error::TxCode;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The last committed height and application digest, stored in consensus state.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainStatus {
    /// The last committed height, 0 before genesis.
    pub height: u64,
    /// The application digest after that height.
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
}

/// Whether a CheckTx call is a first submission or a mempool recheck.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckTxKind {
    /// A transaction the mempool has not seen before.
    New,
    /// A transaction being rechecked after a commit.
    Recheck,
}

/// Admission request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckTxRequest {
    /// Raw transaction bytes.
    pub tx: Vec<u8>,
    /// New or recheck.
    pub kind: CheckTxKind,
}

/// Admission result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckTxResponse {
    /// The admission code.
    pub code: u32,
    /// A human-readable reason on rejection.
    pub log: String,
}

impl CheckTxResponse {
    /// An accepting response.
    pub fn ok() -> Self {
        Self {
            code: TxCode::Ok.as_u32(),
            log: String::new(),
        }
    }

    /// A rejecting response.
    pub fn reject(code: TxCode, log: impl Into<String>) -> Self {
        Self {
            code: code.as_u32(),
            log: log.into(),
        }
    }
}

/// Proposal assembly request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareProposalRequest {
    /// Candidate raw transactions in the engine's order.
    pub txs: Vec<Vec<u8>>,
    /// The byte budget for the proposal.
    pub max_tx_bytes: u64,
    /// The height being proposed.
    pub height: u64,
    /// The proposer's validator address.
    pub proposer_address: Vec<u8>,
}

/// Proposal assembly result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrepareProposalResponse {
    /// The ordered raw transactions.
    pub txs: Vec<Vec<u8>>,
}

/// Proposal validation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessProposalRequest {
    /// The proposed raw transactions.
    pub txs: Vec<Vec<u8>>,
    /// The proposal height.
    pub height: u64,
    /// The proposer's validator address.
    pub proposer_address: Vec<u8>,
}

/// Verdict on a proposal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// The proposal is valid.
    Accept,
    /// The proposal is invalid.
    Reject,
}

/// The kind of misbehavior the engine reports.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MisbehaviorKind {
    /// The validator signed two conflicting votes.
    DuplicateVote,
    /// The validator attacked a light client.
    LightClientAttack,
}

/// A misbehaving validator reported by the engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Misbehavior {
    /// The kind of misbehavior.
    pub kind: MisbehaviorKind,
    /// The validator's address.
    #[serde(with = "hex_bytes")]
    pub validator_address: Vec<u8>,
    /// The height of the infraction.
    pub height: u64,
}

/// Block execution request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FinalizeBlockRequest {
    /// The ordered raw transactions.
    pub txs: Vec<Vec<u8>>,
    /// Misbehaving validators to punish.
    pub misbehavior: Vec<Misbehavior>,
    /// The block height.
    pub height: u64,
    /// The proposer's validator address.
    pub proposer_address: Vec<u8>,
}

/// A key/value attribute of an execution event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

/// A structured event emitted by transaction execution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// The event kind.
    pub kind: String,
    /// Ordered attributes.
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Builds an event from string pairs.
    pub fn new<K: Into<String>, V: Into<String>>(
        kind: impl Into<String>,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            kind: kind.into(),
            attributes: attrs
                .into_iter()
                .map(|(k, v)| EventAttribute {
                    key: k.into(),
                    value: v.into(),
                })
                .collect(),
        }
    }
}

/// The result of executing one transaction in a block.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecTxResult {
    /// The result code.
    pub code: u32,
    /// The error message, if any.
    pub log: String,
    /// The amount charged to the sender.
    pub gas_used: u128,
    /// Structured events.
    pub events: Vec<Event>,
}

impl ExecTxResult {
    /// The typed result code, or `UnknownError` for unrecognised values.
    pub fn tx_code(&self) -> TxCode {
        TxCode::from_u32(self.code).unwrap_or(TxCode::UnknownError)
    }
}

/// A validator power change reported to the engine.
pub type ValidatorUpdate = Validator;

/// Block execution result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FinalizeBlockResponse {
    /// One result per transaction, in block order.
    pub tx_results: Vec<ExecTxResult>,
    /// Validator power changes, with removed validators at power 0.
    pub validator_updates: Vec<ValidatorUpdate>,
    /// The new application digest.
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
}

/// Commit result.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitResponse {
    /// Blocks below this height may be pruned by the engine. 0 retains all.
    pub retain_height: u64,
}

/// Info result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InfoResponse {
    /// The application version.
    pub app_version: u64,
    /// The last committed height.
    pub last_block_height: u64,
    /// The last committed application digest.
    #[serde(with = "hex_bytes")]
    pub last_block_app_hash: Vec<u8>,
}

/// Chain bootstrap request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitChainRequest {
    /// The chain id.
    pub chain_id: String,
    /// The first block height.
    pub initial_height: u64,
    /// Genesis validators supplied by the engine.
    pub validators: Vec<ValidatorUpdate>,
}

/// Chain bootstrap result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitChainResponse {
    /// The validator set the application settled on.
    pub validators: Vec<ValidatorUpdate>,
    /// The genesis application digest.
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
}

/// Query request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    /// The query path, e.g. `account/<hex>`.
    pub path: String,
}

/// Query result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponse {
    /// 0 on success.
    pub code: u32,
    /// JSON-encoded value.
    pub value: Vec<u8>,
    /// Error message on failure.
    pub log: String,
    /// The height the query was answered at.
    pub height: u64,
}

/// Vote extension request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendVoteRequest {
    /// The height being voted on.
    pub height: u64,
}

/// Vote extension result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendVoteResponse {
    /// The encoded extension.
    pub vote_extension: Vec<u8>,
}

/// Vote extension verification request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyVoteExtensionRequest {
    /// The height being voted on.
    pub height: u64,
    /// The extending validator's address.
    pub validator_address: Vec<u8>,
    /// The extension bytes.
    pub vote_extension: Vec<u8>,
}

/// Verdict on a vote extension.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// The extension is acceptable.
    Accept,
    /// The extension is malformed.
    Reject,
}

/// Snapshot metadata advertised to peers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// The snapshot height.
    pub height: u64,
    /// The snapshot format.
    pub format: u32,
    /// The number of chunks.
    pub chunks: u32,
    /// Hash over the chunk hashes.
    #[serde(with = "hex_bytes")]
    pub hash: Vec<u8>,
    /// Opaque metadata (the encoded chunk hash list).
    #[serde(with = "hex_bytes")]
    pub metadata: Vec<u8>,
}

/// Chunk request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadSnapshotChunkRequest {
    /// The snapshot height.
    pub height: u64,
    /// The snapshot format.
    pub format: u32,
    /// The chunk index.
    pub chunk: u32,
}

/// Snapshot offer request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferSnapshotRequest {
    /// The offered snapshot.
    pub snapshot: Snapshot,
    /// The trusted application digest at the snapshot height.
    pub app_hash: Vec<u8>,
}

/// Verdict on a snapshot offer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferSnapshotResult {
    /// Start restoring from this snapshot.
    Accept,
    /// Abort state sync.
    Abort,
    /// Reject this snapshot.
    Reject,
    /// Reject every snapshot of this format.
    RejectFormat,
}

/// Chunk apply request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplySnapshotChunkRequest {
    /// The chunk index.
    pub index: u32,
    /// The chunk bytes.
    pub chunk: Vec<u8>,
    /// The peer that sent the chunk.
    pub sender: String,
}

/// Verdict on an applied chunk.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplySnapshotChunkResult {
    /// The chunk was applied.
    Accept,
    /// Abort state sync.
    Abort,
    /// Refetch and retry the listed chunks.
    Retry,
    /// Restart the snapshot from the beginning.
    RetrySnapshot,
    /// Give up on this snapshot.
    RejectSnapshot,
}

/// Chunk apply response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplySnapshotChunkResponse {
    /// The verdict.
    pub result: ApplySnapshotChunkResult,
    /// Chunks to refetch.
    pub refetch_chunks: Vec<u32>,
    /// Peers to stop fetching from.
    pub reject_senders: Vec<String>,
}
