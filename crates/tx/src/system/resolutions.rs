// Path: crates/tx/src/system/resolutions.rs

//! Resolution types: how a confirmed resolution's body takes effect.
//!
//! Types are registered once at boot into a [`ResolutionRegistry`]. Each type
//! carries its confirmation and refund thresholds and how long its
//! resolutions stay open.

use crate::system::{accounts, voting};
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_api::state::StateAccess;
use strata_types::app::{
    Validator, DEPOSIT_EVENT_TYPE, VALIDATOR_JOIN_EVENT_TYPE, VALIDATOR_REMOVE_EVENT_TYPE,
};
use strata_types::codec;
use strata_types::config::ConsensusParams;
use strata_types::error::VotingError;
use strata_types::vote_extension::DepositAttestation;

/// A fraction of total validator power.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Threshold {
    /// Numerator.
    pub num: u64,
    /// Denominator, never 0.
    pub den: u64,
}

impl Threshold {
    /// Builds a threshold. A zero denominator is treated as 1.
    pub const fn new(num: u64, den: u64) -> Self {
        Self {
            num,
            den: if den == 0 { 1 } else { den },
        }
    }

    /// The power needed to reach this fraction of `total`, rounded up.
    pub fn required(&self, total: u64) -> u64 {
        let num = u128::from(self.num) * u128::from(total) + u128::from(self.den) - 1;
        u64::try_from(num / u128::from(self.den)).unwrap_or(u64::MAX)
    }

    /// Whether `power` reaches the threshold of `total`.
    pub fn is_met(&self, power: u64, total: u64) -> bool {
        power >= self.required(total)
    }
}

/// The behaviour behind one resolution type tag.
pub trait ResolutionType: Send + Sync {
    /// The type tag.
    fn name(&self) -> &'static str;

    /// Approving power needed to confirm.
    fn confirmation_threshold(&self) -> Threshold;

    /// Approving power at which an expired resolution still credits its voters.
    fn refund_threshold(&self) -> Threshold;

    /// Blocks a new resolution of this type stays open.
    fn expiration_period(&self) -> u64;

    /// Applies a confirmed body.
    fn resolve(&self, state: &mut dyn StateAccess, body: &[u8]) -> Result<(), VotingError>;
}

fn decode_validator_change(body: &[u8]) -> Result<Validator, VotingError> {
    codec::from_bytes_canonical(body).map_err(VotingError::InvalidBody)
}

/// Sets a candidate's power once enough validators approve its join.
pub struct ValidatorJoinType {
    expiration: u64,
}

impl ResolutionType for ValidatorJoinType {
    fn name(&self) -> &'static str {
        VALIDATOR_JOIN_EVENT_TYPE
    }

    fn confirmation_threshold(&self) -> Threshold {
        Threshold::new(2, 3)
    }

    fn refund_threshold(&self) -> Threshold {
        Threshold::new(1, 3)
    }

    fn expiration_period(&self) -> u64 {
        self.expiration
    }

    fn resolve(&self, state: &mut dyn StateAccess, body: &[u8]) -> Result<(), VotingError> {
        let change = decode_validator_change(body)?;
        voting::set_validator_power(state, &change.pub_key, change.power)?;
        Ok(())
    }
}

/// Removes a validator once enough validators approve.
pub struct ValidatorRemoveType {
    expiration: u64,
}

impl ResolutionType for ValidatorRemoveType {
    fn name(&self) -> &'static str {
        VALIDATOR_REMOVE_EVENT_TYPE
    }

    fn confirmation_threshold(&self) -> Threshold {
        Threshold::new(2, 3)
    }

    fn refund_threshold(&self) -> Threshold {
        Threshold::new(1, 3)
    }

    fn expiration_period(&self) -> u64 {
        self.expiration
    }

    fn resolve(&self, state: &mut dyn StateAccess, body: &[u8]) -> Result<(), VotingError> {
        let change = decode_validator_change(body)?;
        voting::set_validator_power(state, &change.pub_key, 0)?;
        Ok(())
    }
}

/// Credits an account for a deposit attested on another chain.
pub struct DepositType {
    expiration: u64,
}

impl ResolutionType for DepositType {
    fn name(&self) -> &'static str {
        DEPOSIT_EVENT_TYPE
    }

    fn confirmation_threshold(&self) -> Threshold {
        Threshold::new(1, 2)
    }

    fn refund_threshold(&self) -> Threshold {
        Threshold::new(1, 3)
    }

    fn expiration_period(&self) -> u64 {
        self.expiration
    }

    fn resolve(&self, state: &mut dyn StateAccess, body: &[u8]) -> Result<(), VotingError> {
        let deposit =
            DepositAttestation::decode(body).map_err(|e| VotingError::InvalidBody(e.to_string()))?;
        let account = hex::decode(deposit.account.trim_start_matches("0x"))
            .map_err(|e| VotingError::InvalidBody(format!("deposit account: {}", e)))?;
        let amount = deposit
            .amount
            .parse::<u128>()
            .map_err(|e| VotingError::InvalidBody(format!("deposit amount: {}", e)))?;
        accounts::credit(state, &account, amount)
            .map_err(|e| VotingError::Resolve(e.to_string()))
    }
}

/// The registered resolution types, keyed by tag.
#[derive(Clone, Default)]
pub struct ResolutionRegistry {
    types: BTreeMap<&'static str, Arc<dyn ResolutionType>>,
}

impl ResolutionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in validator and deposit types.
    pub fn with_defaults(params: &ConsensusParams) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ValidatorJoinType {
            expiration: params.join_vote_expiration,
        }));
        registry.register(Arc::new(ValidatorRemoveType {
            expiration: params.join_vote_expiration,
        }));
        registry.register(Arc::new(DepositType {
            expiration: params.vote_expiry,
        }));
        registry
    }

    /// Registers a type, replacing any previous one with the same tag.
    pub fn register(&mut self, ty: Arc<dyn ResolutionType>) {
        self.types.insert(ty.name(), ty);
    }

    /// Looks up a type.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn ResolutionType>, VotingError> {
        self.types
            .get(name)
            .ok_or_else(|| VotingError::UnknownResolutionType(name.to_string()))
    }

    /// Registered types in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ResolutionType>> {
        self.types.values()
    }

    /// Whether resolutions of this type are remembered as processed once
    /// applied. Validator changes are not: the same body may recur later.
    pub fn tracks_processed(name: &str) -> bool {
        name != VALIDATOR_JOIN_EVENT_TYPE && name != VALIDATOR_REMOVE_EVENT_TYPE
    }
}
