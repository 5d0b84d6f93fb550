// Path: crates/execution/src/app/end_block.rs

//! Logic that runs after a block's transactions: resolution confirmation and
//! expiry, voter credits, punishment and the validator diff.

use std::collections::BTreeMap;
use strata_api::state::{apply_changeset, StateAccess, StateOverlay};
use strata_telemetry::sinks::execution_metrics;
use strata_tx::pricing::{per_unit, VOTE_BODY_BYTE_PRICE, VOTE_ID_PRICE};
use strata_tx::system::{accounts, voting};
use strata_tx::{ResolutionRegistry, ResolutionType};
use strata_types::app::{ResolutionId, ResolutionRecord, Validator};
use strata_types::error::{AppError, StateError};

/// What end-of-block vote processing did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Confirmed resolutions, in processing order.
    pub confirmed: Vec<ResolutionId>,
    /// Expired resolutions.
    pub expired: Vec<ResolutionId>,
    /// Resolutions now marked processed. Local copies can be forgotten.
    pub processed: Vec<ResolutionId>,
}

/// Rewards owed to voters and body proposers.
#[derive(Default)]
struct Credits(BTreeMap<Vec<u8>, u128>);

impl Credits {
    fn add(&mut self, who: &[u8], amount: u128) {
        let entry = self.0.entry(who.to_vec()).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Voters other than the proposer earn the vote-id price; the proposer
    /// earns the body price whether or not it also voted by id.
    fn apply(&mut self, record: &ResolutionRecord) {
        for voter in &record.voters {
            if *voter != record.proposer {
                self.add(voter, VOTE_ID_PRICE);
            }
        }
        let body_len = record.event.as_ref().map_or(0, |e| e.body.len());
        if !record.proposer.is_empty() {
            self.add(&record.proposer, per_unit(VOTE_BODY_BYTE_PRICE, body_len));
        }
    }
}

/// Confirms and expires resolutions at `height`.
///
/// Every type is checked against the total power as it stood before any
/// resolution of this block took effect; resolve functions run afterwards,
/// each in its own scope so a failing one is skipped without affecting the
/// others.
pub fn process_votes(
    state: &mut dyn StateAccess,
    registry: &ResolutionRegistry,
    height: u64,
    gas_enabled: bool,
) -> Result<VoteOutcome, AppError> {
    let total = voting::total_power(&*state)?;
    let mut credits = Credits::default();
    let mut outcome = VoteOutcome::default();
    let mut to_resolve: Vec<(ResolutionRecord, &dyn ResolutionType)> = Vec::new();

    for ty in registry.iter() {
        let threshold = ty.confirmation_threshold();
        for record in voting::resolutions_by_type(&*state, ty.name())? {
            let power = voting::approved_power(&*state, &record)?;
            if !threshold.is_met(power, total) {
                continue;
            }
            credits.apply(&record);
            outcome.confirmed.push(record.id);
            if ResolutionRegistry::tracks_processed(ty.name()) {
                outcome.processed.push(record.id);
            }
            to_resolve.push((record, ty.as_ref()));
        }
    }

    for (record, ty) in &to_resolve {
        let Some(event) = &record.event else { continue };
        let mut scope = StateOverlay::new(&*state);
        match ty.resolve(&mut scope, &event.body) {
            Ok(()) => {
                let changes = scope.into_ordered_batch();
                apply_changeset(state, &changes)?;
                execution_metrics().inc_resolutions_confirmed(ty.name());
                tracing::debug!(target: "execution", id = %record.id, kind = ty.name(), "resolution applied");
            }
            Err(e) => {
                tracing::warn!(target: "execution", id = %record.id, kind = ty.name(), error = %e, "resolution failed to apply");
            }
        }
    }

    for record in voting::expired_resolutions(&*state, height)? {
        if outcome.confirmed.contains(&record.id) {
            continue;
        }
        outcome.expired.push(record.id);
        let Some(kind) = record.event_type() else {
            tracing::debug!(target: "execution", id = %record.id, "id-only resolution expired");
            continue;
        };
        execution_metrics().inc_resolutions_expired(kind);
        if ResolutionRegistry::tracks_processed(kind) {
            outcome.processed.push(record.id);
        }
        let refunded = match registry.get(kind) {
            Ok(ty) => ty
                .refund_threshold()
                .is_met(voting::approved_power(&*state, &record)?, total),
            Err(_) => false,
        };
        if refunded {
            credits.apply(&record);
        }
        tracing::debug!(target: "execution", id = %record.id, kind, refunded, "resolution expired");
    }

    for id in outcome.confirmed.iter().chain(&outcome.expired) {
        voting::delete_resolution(state, id)?;
    }
    voting::mark_processed(state, &outcome.processed)?;

    if gas_enabled {
        for (who, amount) in credits.0 {
            accounts::credit(state, &who, amount)?;
        }
    }
    Ok(outcome)
}

/// Reduces the power of each misbehaving validator by one.
pub fn punish(state: &mut dyn StateAccess, pub_keys: &[Vec<u8>]) -> Result<(), StateError> {
    for pub_key in pub_keys {
        let power = voting::validator_power(&*state, pub_key)?;
        if power == 0 {
            continue;
        }
        voting::set_validator_power(state, pub_key, power - 1)?;
        tracing::info!(
            target: "execution",
            validator = %hex::encode(pub_key),
            power = power - 1,
            "validator punished"
        );
    }
    Ok(())
}

/// The changes between two validator sets, ordered by public key. Removed
/// validators are reported with power 0.
pub fn validator_diff(before: &[Validator], after: &[Validator]) -> Vec<Validator> {
    let old: BTreeMap<&[u8], u64> = before.iter().map(|v| (v.pub_key.as_slice(), v.power)).collect();
    let new: BTreeMap<&[u8], u64> = after.iter().map(|v| (v.pub_key.as_slice(), v.power)).collect();

    let mut diff: BTreeMap<&[u8], u64> = BTreeMap::new();
    for (key, power) in &new {
        if old.get(key) != Some(power) {
            diff.insert(key, *power);
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            diff.insert(key, 0);
        }
    }
    diff.into_iter()
        .map(|(pub_key, power)| Validator {
            pub_key: pub_key.to_vec(),
            power,
        })
        .collect()
}
