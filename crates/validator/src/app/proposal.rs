// Path: crates/validator/src/app/proposal.rs
//! Proposal assembly and validation.
//!
//! Both directions share one view of a block: transactions grouped by sender,
//! each sender's nonces contiguous from its committed nonce. Assembly repairs
//! what it can and drops the rest; validation rejects the whole proposal on
//! the first violation.

use ahash::AHashSet;
use std::collections::BTreeMap;
use strata_api::identity::AuthRegistry;
use strata_api::state::StateRead;
use strata_crypto::algorithms::hash::tx_hash;
use strata_tx::order_by_sender_nonce;
use strata_tx::system::accounts;
use strata_types::app::{PayloadKind, Transaction, ValidatorVoteBodies, ValidatorVoteIds};
use strata_types::error::TransactionError;
use thiserror::Error;

use super::sig_cache::VerifiedSignatures;

/// Why a proposal was rejected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProposalError {
    #[error("transaction {index} does not decode: {reason}")]
    Undecodable { index: usize, reason: String },
    #[error("sender {sender}: expected nonce {expected}, got {got}")]
    Nonce {
        sender: String,
        expected: u64,
        got: u64,
    },
    #[error("transaction for chain '{0}'")]
    WrongChain(String),
    #[error("vote bodies from {0}, who is not the proposer")]
    VoteBodiesFromNonProposer(String),
    #[error("{count} votes in one transaction, limit is {max}")]
    TooManyVotes { count: usize, max: u64 },
    #[error("vote payload: {0}")]
    Payload(String),
    #[error("signature: {0}")]
    Signature(String),
    #[error("state: {0}")]
    State(String),
}

/// How many votes a vote transaction carries, or `None` for other payloads.
pub fn vote_count(tx: &Transaction) -> Result<Option<usize>, TransactionError> {
    match tx.body.payload_kind() {
        Some(PayloadKind::ValidatorVoteIds) => Ok(Some(
            tx.decode_payload::<ValidatorVoteIds>()?.resolution_ids.len(),
        )),
        Some(PayloadKind::ValidatorVoteBodies) => {
            Ok(Some(tx.decode_payload::<ValidatorVoteBodies>()?.events.len()))
        }
        _ => Ok(None),
    }
}

fn is_vote_bodies(tx: &Transaction) -> bool {
    tx.body.payload_kind() == Some(PayloadKind::ValidatorVoteBodies)
}

/// Settings shared by assembly and validation.
#[derive(Clone, Copy, Debug)]
pub struct ProposalRules<'a> {
    pub chain_id: &'a str,
    pub gas_enabled: bool,
    pub max_votes_per_tx: u64,
}

/// A candidate that survived filtering.
#[derive(Debug)]
pub struct Picked<'a> {
    pub raw: &'a [u8],
    pub sender: Vec<u8>,
}

/// The filtered candidate set, split around the proposer.
#[derive(Debug)]
pub struct Assembly<'a> {
    /// The proposer's own transactions, in nonce order.
    pub proposer: Vec<&'a [u8]>,
    /// The proposer's next unused nonce.
    pub next_proposer_nonce: u64,
    /// Everyone else's transactions, in block order.
    pub others: Vec<Picked<'a>>,
}

/// Decodes, orders and filters the candidate set.
///
/// Undecodable entries, over-limit vote transactions, vote bodies not from
/// the proposer and (with gas) transactions from unfunded accounts are
/// dropped with a warning.
pub fn assemble<'a, S: StateRead + ?Sized>(
    state: &S,
    candidates: &'a [Vec<u8>],
    proposer: &[u8],
    rules: ProposalRules<'_>,
) -> Result<Assembly<'a>, ProposalError> {
    let mut raws = Vec::with_capacity(candidates.len());
    let mut txs = Vec::with_capacity(candidates.len());
    for (i, raw) in candidates.iter().enumerate() {
        match Transaction::from_wire(raw) {
            Ok(tx) => {
                raws.push(raw.as_slice());
                txs.push(tx);
            }
            Err(e) => tracing::warn!(
                target: "consensus_app",
                index = i,
                error = %e,
                "dropping undecodable transaction from proposal"
            ),
        }
    }

    let mut assembly = Assembly {
        proposer: Vec::new(),
        next_proposer_nonce: 0,
        others: Vec::new(),
    };
    let mut proposer_nonce = None;
    for idx in order_by_sender_nonce(&txs) {
        let (Some(tx), Some(raw)) = (txs.get(idx), raws.get(idx)) else {
            continue;
        };
        match vote_count(tx) {
            Err(e) => {
                tracing::warn!(target: "consensus_app", error = %e, "dropping vote transaction with bad payload");
                continue;
            }
            Ok(Some(n)) if n as u64 > rules.max_votes_per_tx => {
                tracing::warn!(
                    target: "consensus_app",
                    votes = n,
                    limit = rules.max_votes_per_tx,
                    "dropping vote transaction over the limit"
                );
                continue;
            }
            Ok(_) => {}
        }
        if is_vote_bodies(tx) && tx.sender != proposer {
            tracing::warn!(target: "consensus_app", "dropping vote bodies from a non-proposer");
            continue;
        }
        if rules.gas_enabled {
            let account = accounts::get_account(state, &tx.sender)
                .map_err(|e| ProposalError::State(e.to_string()))?;
            if account.is_empty() {
                tracing::warn!(
                    target: "consensus_app",
                    sender = %hex::encode(&tx.sender),
                    "dropping transaction from unfunded account"
                );
                continue;
            }
        }
        if tx.sender == proposer {
            proposer_nonce = Some(tx.body.nonce.saturating_add(1));
            assembly.proposer.push(*raw);
        } else {
            assembly.others.push(Picked {
                raw: *raw,
                sender: tx.sender.clone(),
            });
        }
    }

    assembly.next_proposer_nonce = match proposer_nonce {
        Some(n) => n,
        None => accounts::get_account(state, proposer)
            .map_err(|e| ProposalError::State(e.to_string()))?
            .nonce
            .saturating_add(1),
    };
    Ok(assembly)
}

/// Lays out the block within `budget` bytes: the proposer's transactions,
/// then `injected`, then everyone else.
///
/// The budget is best effort. Once one of a sender's transactions does not
/// fit, that sender's later transactions are skipped so its nonces stay
/// contiguous, but smaller transactions from other senders may still fill
/// the remaining space. If a proposer transaction is cut, `injected` is
/// dropped as well, since its nonce would follow the cut one.
pub fn fill(assembly: Assembly<'_>, injected: Option<Vec<u8>>, budget: u64) -> Vec<Vec<u8>> {
    let mut remaining = budget;
    let mut out = Vec::new();
    let mut proposer_cut = false;
    for raw in assembly.proposer {
        let size = raw.len() as u64;
        if size > remaining {
            proposer_cut = true;
            break;
        }
        remaining -= size;
        out.push(raw.to_vec());
    }
    if let Some(tx) = injected.filter(|_| !proposer_cut) {
        let size = tx.len() as u64;
        if size <= remaining {
            remaining -= size;
            out.push(tx);
        }
    }
    let mut overflowed: AHashSet<Vec<u8>> = AHashSet::new();
    for picked in assembly.others {
        if overflowed.contains(&picked.sender) {
            continue;
        }
        let size = picked.raw.len() as u64;
        if size > remaining {
            overflowed.insert(picked.sender);
            continue;
        }
        remaining -= size;
        out.push(picked.raw.to_vec());
    }
    out
}

/// Checks a proposal received from `proposer`.
///
/// Every transaction is checked whether or not this node admitted it, except
/// that a signature already verified at admission is not verified again.
pub fn validate<S: StateRead + ?Sized>(
    state: &S,
    txs: &[Vec<u8>],
    proposer: &[u8],
    rules: ProposalRules<'_>,
    auth: &AuthRegistry,
    verified: &VerifiedSignatures,
) -> Result<(), ProposalError> {
    let mut by_sender: BTreeMap<Vec<u8>, Vec<(Transaction, [u8; 32])>> = BTreeMap::new();
    for (index, raw) in txs.iter().enumerate() {
        let tx = Transaction::from_wire(raw).map_err(|e| ProposalError::Undecodable {
            index,
            reason: e.to_string(),
        })?;
        by_sender
            .entry(tx.sender.clone())
            .or_default()
            .push((tx, tx_hash(raw)));
    }

    for (sender, group) in &by_sender {
        let account =
            accounts::get_account(state, sender).map_err(|e| ProposalError::State(e.to_string()))?;
        let mut expected = account.nonce.saturating_add(1);
        for (tx, hash) in group {
            if tx.body.nonce != expected {
                return Err(ProposalError::Nonce {
                    sender: hex::encode(sender),
                    expected,
                    got: tx.body.nonce,
                });
            }
            expected = expected.saturating_add(1);

            if !tx.body.chain_id.is_empty() && tx.body.chain_id != rules.chain_id {
                return Err(ProposalError::WrongChain(tx.body.chain_id.clone()));
            }
            if is_vote_bodies(tx) && tx.sender != proposer {
                return Err(ProposalError::VoteBodiesFromNonProposer(hex::encode(sender)));
            }
            let count = vote_count(tx).map_err(|e| ProposalError::Payload(e.to_string()))?;
            if let Some(count) = count.filter(|n| *n as u64 > rules.max_votes_per_tx) {
                return Err(ProposalError::TooManyVotes {
                    count,
                    max: rules.max_votes_per_tx,
                });
            }
            if !verified.contains(hash) {
                auth.verify(
                    &tx.signature.sig_type,
                    &tx.sender,
                    &tx.body.signing_bytes(),
                    &tx.signature.signature,
                )
                .map_err(|e| ProposalError::Signature(e.to_string()))?;
            }
        }
    }
    Ok(())
}
