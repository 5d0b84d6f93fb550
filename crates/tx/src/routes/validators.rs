// Path: crates/tx/src/routes/validators.rs

//! Validator lifecycle routes.
//!
//! Join and remove never change power directly. They stage a resolution that
//! takes effect only once enough validator power approves it. Leave is the
//! one unilateral change.

use crate::effects::LocalEffects;
use crate::pricing::{VALIDATOR_LIFECYCLE_PRICE, VALIDATOR_REMOVE_PRICE};
use crate::router::Route;
use crate::routes::require_validator;
use crate::system::voting;
use strata_api::state::StateAccess;
use strata_api::transaction::context::TxContext;
use strata_types::app::{
    Event, PayloadKind, Transaction, Validator, ValidatorApprove, ValidatorJoin, ValidatorLeave,
    ValidatorRemove, VotableEvent, VALIDATOR_JOIN_EVENT_TYPE, VALIDATOR_REMOVE_EVENT_TYPE,
};
use strata_types::codec;
use strata_types::error::{TransactionError, VotingError};

fn validator_change_event(event_type: &str, pub_key: &[u8], power: u64) -> Result<VotableEvent, TransactionError> {
    let body = codec::to_bytes_canonical(&Validator {
        pub_key: pub_key.to_vec(),
        power,
    })
    .map_err(TransactionError::Internal)?;
    Ok(VotableEvent {
        event_type: event_type.to_string(),
        body,
    })
}

/// Requests a seat in the validator set.
pub struct JoinRoute;

impl Route for JoinRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorJoin
    }

    fn price(&self, _ctx: &TxContext<'_>, _tx: &Transaction) -> Result<u128, TransactionError> {
        Ok(VALIDATOR_LIFECYCLE_PRICE)
    }

    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let join: ValidatorJoin = tx.decode_payload()?;
        if voting::validator_power(&*state, &tx.sender)? > 0 {
            return Err(TransactionError::InvalidSender(
                "sender is already a validator".into(),
            ));
        }
        let pending =
            voting::resolution_ids_by_type_and_proposer(&*state, VALIDATOR_JOIN_EVENT_TYPE, &tx.sender)?;
        if !pending.is_empty() {
            return Err(TransactionError::InvalidSender(
                "a join request is already pending".into(),
            ));
        }

        let event = validator_change_event(VALIDATOR_JOIN_EVENT_TYPE, &tx.sender, join.power)?;
        let expiration = ctx
            .block_height
            .saturating_add(ctx.params.join_vote_expiration);
        let id = voting::create_resolution(state, &event, expiration, &tx.sender)?;
        Ok(vec![Event::new(
            "validator_join",
            [
                ("candidate", hex::encode(&tx.sender)),
                ("power", join.power.to_string()),
                ("resolution_id", id.to_string()),
                ("expiration", expiration.to_string()),
            ],
        )])
    }
}

/// A validator's approval of a pending join.
pub struct ApproveRoute;

impl Route for ApproveRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorApprove
    }

    fn price(&self, _ctx: &TxContext<'_>, _tx: &Transaction) -> Result<u128, TransactionError> {
        Ok(VALIDATOR_LIFECYCLE_PRICE)
    }

    fn execute(
        &self,
        _ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let approve: ValidatorApprove = tx.decode_payload()?;
        if approve.candidate == tx.sender {
            return Err(TransactionError::InvalidSender(
                "a candidate cannot approve its own join".into(),
            ));
        }
        let pending = voting::resolution_ids_by_type_and_proposer(
            &*state,
            VALIDATOR_JOIN_EVENT_TYPE,
            &approve.candidate,
        )?;
        let id = match pending.as_slice() {
            [] => {
                return Err(TransactionError::InvalidSender(format!(
                    "no pending join for {}",
                    hex::encode(&approve.candidate)
                )))
            }
            [id] => *id,
            _ => {
                return Err(TransactionError::Internal(format!(
                    "{} pending joins for {}",
                    pending.len(),
                    hex::encode(&approve.candidate)
                )))
            }
        };
        require_validator(&*state, &tx.sender, "approve joins")?;
        voting::approve(state, &id, &tx.sender)?;
        Ok(vec![Event::new(
            "validator_approve",
            [
                ("candidate", hex::encode(&approve.candidate)),
                ("approver", hex::encode(&tx.sender)),
                ("resolution_id", id.to_string()),
            ],
        )])
    }
}

/// Proposes removing a validator; the proposer's own approval is recorded.
pub struct RemoveRoute;

impl Route for RemoveRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorRemove
    }

    fn price(&self, _ctx: &TxContext<'_>, _tx: &Transaction) -> Result<u128, TransactionError> {
        Ok(VALIDATOR_REMOVE_PRICE)
    }

    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let remove: ValidatorRemove = tx.decode_payload()?;
        require_validator(&*state, &tx.sender, "propose removals")?;

        let event = validator_change_event(VALIDATOR_REMOVE_EVENT_TYPE, &remove.validator, 0)?;
        let expiration = ctx
            .block_height
            .saturating_add(ctx.params.join_vote_expiration);
        match voting::create_resolution(state, &event, expiration, &tx.sender) {
            Ok(_) | Err(VotingError::AlreadyHasBody(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let id = event.id();
        voting::approve(state, &id, &tx.sender)?;
        Ok(vec![Event::new(
            "validator_remove",
            [
                ("target", hex::encode(&remove.validator)),
                ("proposer", hex::encode(&tx.sender)),
                ("resolution_id", id.to_string()),
            ],
        )])
    }
}

/// Leaves the validator set immediately.
pub struct LeaveRoute;

impl Route for LeaveRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorLeave
    }

    fn price(&self, _ctx: &TxContext<'_>, _tx: &Transaction) -> Result<u128, TransactionError> {
        Ok(VALIDATOR_LIFECYCLE_PRICE)
    }

    fn execute(
        &self,
        _ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let _: ValidatorLeave = tx.decode_payload()?;
        require_validator(&*state, &tx.sender, "leave")?;
        voting::set_validator_power(state, &tx.sender, 0)?;
        Ok(vec![Event::new(
            "validator_leave",
            [("validator", hex::encode(&tx.sender))],
        )])
    }
}
