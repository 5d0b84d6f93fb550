// Path: crates/tx/src/routes/votes.rs

//! Vote-id and vote-body routes.
//!
//! Validators approve resolutions by id as soon as they observe an event;
//! the block proposer later submits the bodies. Both are priced by size.

use crate::effects::LocalEffects;
use crate::pricing::{per_unit, VOTE_BODY_BYTE_PRICE, VOTE_ID_PRICE};
use crate::router::Route;
use crate::routes::require_validator;
use crate::system::resolutions::ResolutionRegistry;
use crate::system::voting;
use strata_api::state::StateAccess;
use strata_api::transaction::context::TxContext;
use strata_types::app::{Event, PayloadKind, Transaction, ValidatorVoteBodies, ValidatorVoteIds};
use strata_types::error::{TransactionError, VotingError};

/// Approvals by resolution id.
pub struct VoteIdsRoute;

impl Route for VoteIdsRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorVoteIds
    }

    fn price(&self, _ctx: &TxContext<'_>, tx: &Transaction) -> Result<u128, TransactionError> {
        let votes: ValidatorVoteIds = tx.decode_payload()?;
        Ok(per_unit(VOTE_ID_PRICE, votes.resolution_ids.len()))
    }

    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let votes: ValidatorVoteIds = tx.decode_payload()?;
        require_validator(&*state, &tx.sender, "vote")?;

        let is_local = tx.sender.as_slice() == ctx.local_identity;
        let expiration = ctx.block_height.saturating_add(ctx.params.vote_expiry);
        let mut approved = 0usize;
        for id in &votes.resolution_ids {
            if voting::is_processed(&*state, id)? {
                if is_local {
                    effects.delete(*id);
                }
                continue;
            }
            voting::approve_or_create(state, id, &tx.sender, expiration)?;
            approved += 1;
            if is_local {
                let has_body = voting::get_resolution(&*state, id)?
                    .is_some_and(|r| r.event.is_some());
                if has_body {
                    effects.delete(*id);
                } else {
                    effects.mark_received(*id);
                }
            }
        }
        Ok(vec![Event::new(
            "vote_ids",
            [
                ("voter", hex::encode(&tx.sender)),
                ("approved", approved.to_string()),
            ],
        )])
    }
}

/// Resolution bodies, submitted by the block proposer only.
pub struct VoteBodiesRoute {
    resolutions: ResolutionRegistry,
}

impl VoteBodiesRoute {
    pub fn new(resolutions: ResolutionRegistry) -> Self {
        Self { resolutions }
    }
}

impl Route for VoteBodiesRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::ValidatorVoteBodies
    }

    fn price(&self, _ctx: &TxContext<'_>, tx: &Transaction) -> Result<u128, TransactionError> {
        let bodies: ValidatorVoteBodies = tx.decode_payload()?;
        Ok(per_unit(VOTE_BODY_BYTE_PRICE, bodies.body_bytes()))
    }

    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let bodies: ValidatorVoteBodies = tx.decode_payload()?;
        if tx.sender.as_slice() != ctx.proposer {
            return Err(TransactionError::InvalidSender(
                "only the block proposer may submit vote bodies".into(),
            ));
        }

        let is_local = tx.sender.as_slice() == ctx.local_identity;
        let mut created = 0usize;
        for event in &bodies.events {
            let ty = self.resolutions.get(&event.event_type)?;
            let id = event.id();
            // A processed body must not confirm a second time.
            if voting::is_processed(&*state, &id)? {
                if is_local {
                    effects.delete(id);
                }
                continue;
            }
            let expiration = ctx.block_height.saturating_add(ty.expiration_period());
            match voting::create_resolution(state, event, expiration, &tx.sender) {
                Ok(_) => created += 1,
                Err(VotingError::AlreadyHasBody(_)) => {}
                Err(e) => return Err(e.into()),
            }
            voting::approve(state, &id, &tx.sender)?;
            if is_local {
                effects.delete(id);
            }
        }
        Ok(vec![Event::new(
            "vote_bodies",
            [
                ("proposer", hex::encode(&tx.sender)),
                ("events", bodies.events.len().to_string()),
                ("created", created.to_string()),
            ],
        )])
    }
}
