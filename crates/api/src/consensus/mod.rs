// Path: crates/api/src/consensus/mod.rs

//! Defines the `ConsensusApplication` trait: the callback surface an external
//! BFT consensus engine drives.
//!
//! Callbacks arrive on logically separate connections. Calls within one
//! connection are serialized, but admission (`check_tx`) may race with block
//! execution, so implementations must not share a lock between the two.

use async_trait::async_trait;
use strata_types::app::{
    ApplySnapshotChunkRequest, ApplySnapshotChunkResponse, CheckTxRequest, CheckTxResponse,
    CommitResponse, ExtendVoteRequest, ExtendVoteResponse, FinalizeBlockRequest,
    FinalizeBlockResponse, InfoResponse, InitChainRequest, InitChainResponse,
    LoadSnapshotChunkRequest, OfferSnapshotRequest, OfferSnapshotResult, PrepareProposalRequest,
    PrepareProposalResponse, ProcessProposalRequest, ProposalStatus, QueryRequest, QueryResponse,
    Snapshot, VerifyStatus, VerifyVoteExtensionRequest,
};
use strata_types::error::AppError;

/// The application side of the consensus callback protocol.
///
/// Per-transaction failures are reported inside responses. An `Err` from any
/// method is fatal: the node must halt rather than diverge.
#[async_trait]
pub trait ConsensusApplication: Send + Sync {
    /// Admits or rejects a transaction into the mempool.
    async fn check_tx(&self, req: CheckTxRequest) -> Result<CheckTxResponse, AppError>;

    /// Orders the candidate transactions for a proposal.
    async fn prepare_proposal(
        &self,
        req: PrepareProposalRequest,
    ) -> Result<PrepareProposalResponse, AppError>;

    /// Validates a proposal from any proposer.
    async fn process_proposal(&self, req: ProcessProposalRequest)
        -> Result<ProposalStatus, AppError>;

    /// Executes a decided block.
    async fn finalize_block(
        &self,
        req: FinalizeBlockRequest,
    ) -> Result<FinalizeBlockResponse, AppError>;

    /// Durably commits the last finalized block.
    async fn commit(&self) -> Result<CommitResponse, AppError>;

    /// Reports the last committed height and digest.
    async fn info(&self) -> Result<InfoResponse, AppError>;

    /// Applies genesis.
    async fn init_chain(&self, req: InitChainRequest) -> Result<InitChainResponse, AppError>;

    /// Answers a read-only query.
    async fn query(&self, req: QueryRequest) -> Result<QueryResponse, AppError>;

    /// Produces this validator's vote extension.
    async fn extend_vote(&self, req: ExtendVoteRequest) -> Result<ExtendVoteResponse, AppError>;

    /// Verifies a peer's vote extension.
    async fn verify_vote_extension(
        &self,
        req: VerifyVoteExtensionRequest,
    ) -> Result<VerifyStatus, AppError>;

    /// Lists the locally available snapshots.
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, AppError>;

    /// Loads one chunk of a local snapshot.
    async fn load_snapshot_chunk(&self, req: LoadSnapshotChunkRequest)
        -> Result<Vec<u8>, AppError>;

    /// Considers a snapshot offered by a peer.
    async fn offer_snapshot(&self, req: OfferSnapshotRequest)
        -> Result<OfferSnapshotResult, AppError>;

    /// Applies one chunk of the accepted snapshot.
    async fn apply_snapshot_chunk(
        &self,
        req: ApplySnapshotChunkRequest,
    ) -> Result<ApplySnapshotChunkResponse, AppError>;
}
