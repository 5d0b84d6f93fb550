// Path: crates/tx/src/pricing.rs
//! Route prices. Every price is 0 when gas is disabled; that switch lives
//! in the router, so these are the gas-enabled values.

/// Deploying a dataset.
pub const DEPLOY_PRICE: u128 = 1_000_000_000_000_000_000;
/// Dropping a dataset.
pub const DROP_PRICE: u128 = 10_000_000_000_000;
/// One action call; an execution is priced per argument set.
pub const EXECUTE_CALL_PRICE: u128 = 2_000_000_000_000_000;
/// A value transfer.
pub const TRANSFER_PRICE: u128 = 210_000;
/// Validator join, approve and leave.
pub const VALIDATOR_LIFECYCLE_PRICE: u128 = 10_000_000_000_000;
/// Proposing a validator removal.
pub const VALIDATOR_REMOVE_PRICE: u128 = 100_000;
/// One resolution id in a vote-ids transaction. Also what each voter is
/// credited per approval when a resolution settles.
pub const VOTE_ID_PRICE: u128 = 16_000;
/// One body byte in a vote-bodies transaction. Also what the body proposer
/// is credited per byte when a resolution settles.
pub const VOTE_BODY_BYTE_PRICE: u128 = 1_000;

/// `unit * count`, saturating.
pub fn per_unit(unit: u128, count: usize) -> u128 {
    unit.saturating_mul(count as u128)
}
