// Path: crates/tx/src/system/voting.rs

//! The resolution store and validator power.
//!
//! A resolution is keyed by its content-derived id. It may exist as an
//! id-only record (votes arrived before the body) and gains its event when a
//! body is submitted. Approving power is always computed from the voters'
//! current validator power, so a validator that leaves stops counting.

use strata_api::state::{StateAccess, StateRead, StateReadExt, StateWriteExt};
use strata_types::app::{
    ResolutionId, ResolutionInfo, ResolutionRecord, Validator, VotableEvent,
};
use strata_types::error::{StateError, VotingError};
use strata_types::keys::{
    processed_key, resolution_key, validator_key, PROCESSED_KEY_PREFIX, RESOLUTION_KEY_PREFIX,
    VALIDATOR_KEY_PREFIX,
};

/// Reads a resolution.
pub fn get_resolution<S: StateRead + ?Sized>(
    state: &S,
    id: &ResolutionId,
) -> Result<Option<ResolutionRecord>, VotingError> {
    Ok(state.get_decoded(&resolution_key(id))?)
}

fn put_resolution<S: StateAccess + ?Sized>(
    state: &mut S,
    record: &ResolutionRecord,
) -> Result<(), VotingError> {
    state.put_encoded(&resolution_key(&record.id), record)?;
    Ok(())
}

/// Attaches a body to a resolution, creating it if needed.
///
/// Votes already cast for an id-only record are kept. Submitting a body for a
/// resolution that already has one is `AlreadyHasBody`.
pub fn create_resolution<S: StateAccess + ?Sized>(
    state: &mut S,
    event: &VotableEvent,
    expiration: u64,
    proposer: &[u8],
) -> Result<ResolutionId, VotingError> {
    let id = event.id();
    let record = match get_resolution(state, &id)? {
        Some(existing) if existing.event.is_some() => {
            return Err(VotingError::AlreadyHasBody(id.to_string()))
        }
        Some(existing) => ResolutionRecord {
            event: Some(event.clone()),
            expiration,
            proposer: proposer.to_vec(),
            ..existing
        },
        None => ResolutionRecord {
            id,
            event: Some(event.clone()),
            expiration,
            proposer: proposer.to_vec(),
            voters: Vec::new(),
        },
    };
    put_resolution(state, &record)?;
    Ok(id)
}

/// Records `voter`'s approval of an existing resolution.
///
/// Returns false if the voter had already approved.
pub fn approve<S: StateAccess + ?Sized>(
    state: &mut S,
    id: &ResolutionId,
    voter: &[u8],
) -> Result<bool, VotingError> {
    let mut record = get_resolution(state, id)?
        .ok_or_else(|| VotingError::ResolutionNotFound(id.to_string()))?;
    let added = record.add_voter(voter);
    if added {
        put_resolution(state, &record)?;
    }
    Ok(added)
}

/// Records an approval, creating an id-only record expiring at `expiration`
/// when the id is unknown.
pub fn approve_or_create<S: StateAccess + ?Sized>(
    state: &mut S,
    id: &ResolutionId,
    voter: &[u8],
    expiration: u64,
) -> Result<bool, VotingError> {
    if get_resolution(state, id)?.is_none() {
        put_resolution(
            state,
            &ResolutionRecord {
                id: *id,
                event: None,
                expiration,
                proposer: Vec::new(),
                voters: Vec::new(),
            },
        )?;
    }
    approve(state, id, voter)
}

/// Every stored resolution, in id order.
pub fn all_resolutions<S: StateRead + ?Sized>(
    state: &S,
) -> Result<Vec<ResolutionRecord>, VotingError> {
    Ok(state
        .scan_decoded::<ResolutionRecord>(RESOLUTION_KEY_PREFIX)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Resolutions with a body of the given type, in id order.
pub fn resolutions_by_type<S: StateRead + ?Sized>(
    state: &S,
    event_type: &str,
) -> Result<Vec<ResolutionRecord>, VotingError> {
    Ok(all_resolutions(state)?
        .into_iter()
        .filter(|r| r.event_type() == Some(event_type))
        .collect())
}

/// Ids of resolutions of the given type whose body was submitted by `proposer`.
pub fn resolution_ids_by_type_and_proposer<S: StateRead + ?Sized>(
    state: &S,
    event_type: &str,
    proposer: &[u8],
) -> Result<Vec<ResolutionId>, VotingError> {
    Ok(resolutions_by_type(state, event_type)?
        .into_iter()
        .filter(|r| r.proposer == proposer)
        .map(|r| r.id)
        .collect())
}

/// Resolutions whose expiration is at or below `height`, in id order.
pub fn expired_resolutions<S: StateRead + ?Sized>(
    state: &S,
    height: u64,
) -> Result<Vec<ResolutionRecord>, VotingError> {
    Ok(all_resolutions(state)?
        .into_iter()
        .filter(|r| r.expiration <= height)
        .collect())
}

/// Removes a resolution. A no-op for unknown ids.
pub fn delete_resolution<S: StateAccess + ?Sized>(
    state: &mut S,
    id: &ResolutionId,
) -> Result<(), VotingError> {
    state.delete(&resolution_key(id))?;
    Ok(())
}

/// Whether a resolution has already been applied.
pub fn is_processed<S: StateRead + ?Sized>(
    state: &S,
    id: &ResolutionId,
) -> Result<bool, VotingError> {
    Ok(state.get(&processed_key(id))?.is_some())
}

/// Marks resolutions as applied so their ids are never voted on again.
pub fn mark_processed<S: StateAccess + ?Sized>(
    state: &mut S,
    ids: &[ResolutionId],
) -> Result<(), VotingError> {
    for id in ids {
        state.insert(&processed_key(id), &[1])?;
    }
    Ok(())
}

/// Keeps the ids that have not been processed, preserving order.
pub fn filter_not_processed<S: StateRead + ?Sized>(
    state: &S,
    ids: &[ResolutionId],
) -> Result<Vec<ResolutionId>, VotingError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !is_processed(state, id)? {
            out.push(*id);
        }
    }
    Ok(out)
}

/// Number of processed markers, for queries and tests.
pub fn processed_count<S: StateRead + ?Sized>(state: &S) -> Result<usize, VotingError> {
    let mut n = 0usize;
    for item in state.prefix_scan(PROCESSED_KEY_PREFIX)? {
        item?;
        n += 1;
    }
    Ok(n)
}

/// The voting power of `pub_key`, 0 for non-validators.
pub fn validator_power<S: StateRead + ?Sized>(
    state: &S,
    pub_key: &[u8],
) -> Result<u64, StateError> {
    Ok(state.get_decoded::<u64>(&validator_key(pub_key))?.unwrap_or(0))
}

/// Sets the voting power of `pub_key`. Power 0 removes the validator.
pub fn set_validator_power<S: StateAccess + ?Sized>(
    state: &mut S,
    pub_key: &[u8],
    power: u64,
) -> Result<(), StateError> {
    let key = validator_key(pub_key);
    if power == 0 {
        state.delete(&key)
    } else {
        state.put_encoded(&key, &power)
    }
}

/// The current validator set, ordered by public key.
pub fn validators<S: StateRead + ?Sized>(state: &S) -> Result<Vec<Validator>, StateError> {
    Ok(state
        .scan_decoded::<u64>(VALIDATOR_KEY_PREFIX)?
        .into_iter()
        .map(|(pub_key, power)| Validator { pub_key, power })
        .collect())
}

/// The summed power of every validator.
pub fn total_power<S: StateRead + ?Sized>(state: &S) -> Result<u64, StateError> {
    Ok(validators(state)?
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(v.power)))
}

/// The summed current power of the resolution's voters.
pub fn approved_power<S: StateRead + ?Sized>(
    state: &S,
    record: &ResolutionRecord,
) -> Result<u64, StateError> {
    let mut power = 0u64;
    for voter in &record.voters {
        power = power.saturating_add(validator_power(state, voter)?);
    }
    Ok(power)
}

/// A query view of a resolution.
pub fn resolution_info<S: StateRead + ?Sized>(
    state: &S,
    record: &ResolutionRecord,
) -> Result<ResolutionInfo, StateError> {
    Ok(ResolutionInfo {
        id: record.id,
        status: record.status(),
        event_type: record.event.as_ref().map(|e| e.event_type.clone()),
        body: record.event.as_ref().map(|e| hex::encode(&e.body)),
        expiration: record.expiration,
        approved_power: approved_power(state, record)?,
        voters: record.voters.iter().map(hex::encode).collect(),
        proposer: (!record.proposer.is_empty()).then(|| hex::encode(&record.proposer)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fresh;
    use strata_types::app::{ResolutionStatus, DEPOSIT_EVENT_TYPE, VALIDATOR_JOIN_EVENT_TYPE};

    fn event(t: &str, body: &[u8]) -> VotableEvent {
        VotableEvent {
            event_type: t.into(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn body_after_votes_keeps_the_votes() {
        let mut state = fresh();
        let ev = event(DEPOSIT_EVENT_TYPE, b"d1");
        let id = ev.id();
        assert!(approve_or_create(&mut state, &id, b"v1", 50).unwrap());
        assert!(!approve_or_create(&mut state, &id, b"v1", 50).unwrap());
        let pending = get_resolution(&state, &id).unwrap().unwrap();
        assert_eq!(pending.status(), ResolutionStatus::PendingIdOnly);
        assert_eq!(pending.expiration, 50);

        create_resolution(&mut state, &ev, 80, b"prop").unwrap();
        let full = get_resolution(&state, &id).unwrap().unwrap();
        assert_eq!(full.status(), ResolutionStatus::HasBody);
        assert_eq!(full.voters, vec![b"v1".to_vec()]);
        assert_eq!(full.expiration, 80);
        assert_eq!(full.proposer, b"prop".to_vec());

        assert_eq!(
            create_resolution(&mut state, &ev, 90, b"other"),
            Err(VotingError::AlreadyHasBody(id.to_string()))
        );
    }

    #[test]
    fn approving_an_unknown_resolution_fails() {
        let mut state = fresh();
        let id = event(DEPOSIT_EVENT_TYPE, b"x").id();
        assert!(matches!(
            approve(&mut state, &id, b"v"),
            Err(VotingError::ResolutionNotFound(_))
        ));
    }

    #[test]
    fn lookups_by_type_proposer_and_expiry() {
        let mut state = fresh();
        let join = event(VALIDATOR_JOIN_EVENT_TYPE, b"j");
        let dep = event(DEPOSIT_EVENT_TYPE, b"d");
        create_resolution(&mut state, &join, 10, b"cand").unwrap();
        create_resolution(&mut state, &dep, 20, b"prop").unwrap();
        approve_or_create(&mut state, &event(DEPOSIT_EVENT_TYPE, b"id-only").id(), b"v", 5)
            .unwrap();

        assert_eq!(resolutions_by_type(&state, DEPOSIT_EVENT_TYPE).unwrap().len(), 1);
        assert_eq!(
            resolution_ids_by_type_and_proposer(&state, VALIDATOR_JOIN_EVENT_TYPE, b"cand")
                .unwrap(),
            vec![join.id()]
        );
        assert!(
            resolution_ids_by_type_and_proposer(&state, VALIDATOR_JOIN_EVENT_TYPE, b"prop")
                .unwrap()
                .is_empty()
        );
        assert_eq!(expired_resolutions(&state, 9).unwrap().len(), 1);
        assert_eq!(expired_resolutions(&state, 10).unwrap().len(), 2);

        delete_resolution(&mut state, &join.id()).unwrap();
        assert!(get_resolution(&state, &join.id()).unwrap().is_none());
        assert_eq!(all_resolutions(&state).unwrap().len(), 2);
    }

    #[test]
    fn processed_markers_filter_ids() {
        let mut state = fresh();
        let a = event(DEPOSIT_EVENT_TYPE, b"a").id();
        let b = event(DEPOSIT_EVENT_TYPE, b"b").id();
        mark_processed(&mut state, &[a]).unwrap();
        assert!(is_processed(&state, &a).unwrap());
        assert_eq!(filter_not_processed(&state, &[a, b, a]).unwrap(), vec![b]);
        assert_eq!(processed_count(&state).unwrap(), 1);
    }

    #[test]
    fn validator_power_and_approved_power() {
        let mut state = fresh();
        set_validator_power(&mut state, b"v1", 3).unwrap();
        set_validator_power(&mut state, b"v2", 4).unwrap();
        set_validator_power(&mut state, b"v0", 1).unwrap();
        set_validator_power(&mut state, b"v0", 0).unwrap();
        assert_eq!(
            validators(&state).unwrap(),
            vec![
                Validator {
                    pub_key: b"v1".to_vec(),
                    power: 3
                },
                Validator {
                    pub_key: b"v2".to_vec(),
                    power: 4
                },
            ]
        );
        assert_eq!(total_power(&state).unwrap(), 7);

        let ev = event(DEPOSIT_EVENT_TYPE, b"p");
        create_resolution(&mut state, &ev, 10, b"v1").unwrap();
        approve(&mut state, &ev.id(), b"v1").unwrap();
        approve(&mut state, &ev.id(), b"stranger").unwrap();
        let record = get_resolution(&state, &ev.id()).unwrap().unwrap();
        let info = resolution_info(&state, &record).unwrap();
        assert_eq!(info.approved_power, 3);
        assert_eq!(info.voters.len(), 2);
        assert_eq!(info.proposer.as_deref(), Some(hex::encode(b"v1").as_str()));

        set_validator_power(&mut state, b"v1", 0).unwrap();
        assert_eq!(approved_power(&state, &record).unwrap(), 0);
    }
}
