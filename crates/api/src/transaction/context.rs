// Path: crates/api/src/transaction/context.rs
//! Defines the stable context for transaction execution.

use strata_types::config::ConsensusParams;

/// Provides stable, read-only context to routes during execution.
#[derive(Clone, Debug)]
pub struct TxContext<'a> {
    /// The current block height being processed.
    pub block_height: u64,
    /// The public key of the block proposer.
    pub proposer: &'a [u8],
    /// The chain id.
    pub chain_id: &'a str,
    /// The hash of the transaction being executed.
    pub tx_hash: [u8; 32],
    /// Whether routes charge their price. When false every price is 0.
    pub gas_enabled: bool,
    /// The local node's public key, for local-event bookkeeping.
    pub local_identity: &'a [u8],
    /// Chain-wide consensus parameters.
    pub params: &'a ConsensusParams,
}

impl TxContext<'_> {
    /// The transaction hash as hex, as passed to the database engine.
    pub fn tx_id(&self) -> String {
        hex::encode(self.tx_hash)
    }
}
