// Path: crates/types/src/app/payloads.rs
//! Transaction payloads, one per route.

use crate::app::resolution::{ResolutionId, VotableEvent};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The closed set of payload types this node routes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Deploy a dataset schema.
    DeploySchema,
    /// Drop a dataset.
    DropSchema,
    /// Execute an action against a dataset.
    Execute,
    /// Move balance between accounts.
    Transfer,
    /// Request to join the validator set.
    ValidatorJoin,
    /// Approve a pending join.
    ValidatorApprove,
    /// Propose removing a validator.
    ValidatorRemove,
    /// Leave the validator set.
    ValidatorLeave,
    /// Approve resolutions by id.
    ValidatorVoteIds,
    /// Submit resolution bodies (proposer only).
    ValidatorVoteBodies,
}

impl PayloadKind {
    /// Every payload kind, in registration order.
    pub const ALL: [PayloadKind; 10] = [
        Self::DeploySchema,
        Self::DropSchema,
        Self::Execute,
        Self::Transfer,
        Self::ValidatorJoin,
        Self::ValidatorApprove,
        Self::ValidatorRemove,
        Self::ValidatorLeave,
        Self::ValidatorVoteIds,
        Self::ValidatorVoteBodies,
    ];

    /// The payload-type tag carried in [`crate::app::TransactionBody::payload_type`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeploySchema => "deploy_schema",
            Self::DropSchema => "drop_schema",
            Self::Execute => "execute",
            Self::Transfer => "transfer",
            Self::ValidatorJoin => "validator_join",
            Self::ValidatorApprove => "validator_approve",
            Self::ValidatorRemove => "validator_remove",
            Self::ValidatorLeave => "validator_leave",
            Self::ValidatorVoteIds => "validator_vote_ids",
            Self::ValidatorVoteBodies => "validator_vote_bodies",
        }
    }

    /// Parses a payload-type tag.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Whether only senders with voting power may submit this payload.
    pub fn requires_validator(self) -> bool {
        matches!(self, Self::ValidatorVoteIds | Self::ValidatorVoteBodies)
    }
}

/// A typed payload that knows its own tag.
pub trait Payload: Encode + Decode {
    /// The payload kind this type encodes.
    const KIND: PayloadKind;
}

/// Deploys a dataset schema.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeploySchema {
    /// The dataset name, unique per owner.
    pub name: String,
    /// The opaque schema definition, interpreted by the engine.
    pub schema: Vec<u8>,
}

/// Drops a dataset.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DropSchema {
    /// The dataset id.
    pub dbid: String,
}

/// Executes an action, once per argument set.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActionExecution {
    /// The dataset id.
    pub dbid: String,
    /// The action name.
    pub action: String,
    /// Argument sets. An empty list executes the action once with no arguments.
    pub arguments: Vec<Vec<String>>,
}

impl ActionExecution {
    /// The number of engine calls this payload performs.
    pub fn call_count(&self) -> usize {
        self.arguments.len().max(1)
    }
}

/// Transfers balance to another account.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// The recipient identity.
    pub to: Vec<u8>,
    /// The amount as a base-10 string.
    pub amount: String,
}

/// Requests to join the validator set with the given power.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorJoin {
    /// The requested voting power.
    pub power: u64,
}

/// Approves a pending join request.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorApprove {
    /// The candidate's public key.
    pub candidate: Vec<u8>,
}

/// Proposes removing a validator.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorRemove {
    /// The validator's public key.
    pub validator: Vec<u8>,
}

/// Leaves the validator set.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorLeave {}

/// Approves resolutions by id.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorVoteIds {
    /// The ids being approved.
    pub resolution_ids: Vec<ResolutionId>,
}

/// Submits resolution bodies on behalf of the block proposer.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ValidatorVoteBodies {
    /// The events being submitted.
    pub events: Vec<VotableEvent>,
}

impl ValidatorVoteBodies {
    /// Total body bytes, which the route prices.
    pub fn body_bytes(&self) -> usize {
        self.events.iter().map(|e| e.body.len()).sum()
    }
}

macro_rules! impl_payload {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Payload for $ty {
            const KIND: PayloadKind = PayloadKind::$kind;
        })*
    };
}

impl_payload! {
    DeploySchema => DeploySchema,
    DropSchema => DropSchema,
    ActionExecution => Execute,
    Transfer => Transfer,
    ValidatorJoin => ValidatorJoin,
    ValidatorApprove => ValidatorApprove,
    ValidatorRemove => ValidatorRemove,
    ValidatorLeave => ValidatorLeave,
    ValidatorVoteIds => ValidatorVoteIds,
    ValidatorVoteBodies => ValidatorVoteBodies,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tags_parse_back() {
        for kind in PayloadKind::ALL {
            assert_eq!(PayloadKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PayloadKind::parse("mint_everything"), None);
    }

    #[test]
    fn only_vote_payloads_require_power() {
        let gated: Vec<_> = PayloadKind::ALL
            .into_iter()
            .filter(|k| k.requires_validator())
            .collect();
        assert_eq!(
            gated,
            vec![PayloadKind::ValidatorVoteIds, PayloadKind::ValidatorVoteBodies]
        );
    }

    #[test]
    fn execution_runs_at_least_once() {
        let mut exec = ActionExecution {
            dbid: "db".into(),
            action: "insert".into(),
            arguments: vec![],
        };
        assert_eq!(exec.call_count(), 1);
        exec.arguments = vec![vec!["a".into()], vec!["b".into()], vec![]];
        assert_eq!(exec.call_count(), 3);
    }
}
