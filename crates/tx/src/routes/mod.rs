// Path: crates/tx/src/routes/mod.rs
//! The built-in routes, one per payload type.

pub mod database;
pub mod transfer;
pub mod validators;
pub mod votes;

use strata_api::state::StateRead;
use strata_types::error::TransactionError;

use crate::system::voting;

/// Rejects senders without voting power.
pub(crate) fn require_validator<S: StateRead + ?Sized>(
    state: &S,
    sender: &[u8],
    action: &str,
) -> Result<u64, TransactionError> {
    let power = voting::validator_power(state, sender)?;
    if power == 0 {
        return Err(TransactionError::InvalidSender(format!(
            "only validators may {}",
            action
        )));
    }
    Ok(power)
}
