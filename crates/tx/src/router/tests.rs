// Path: crates/tx/src/router/tests.rs

use super::*;
use crate::pricing::{DEPLOY_PRICE, TRANSFER_PRICE, VALIDATOR_LIFECYCLE_PRICE};
use crate::system::{accounts, voting};
use crate::test_support::{fresh, tx_from, TestState};
use strata_api::engine::{ProcedureCall, TxData};
use strata_api::identity::Authenticator;
use strata_api::state::{StateRead, StateWriteExt};
use strata_types::app::{
    AccountRecord, DeploySchema, Transfer, ValidatorApprove, ValidatorJoin, ValidatorVoteBodies,
    ValidatorVoteIds, VotableEvent, DEPOSIT_EVENT_TYPE,
};
use strata_types::config::ConsensusParams;
use strata_types::error::{AuthError, EngineError};
use strata_types::keys::{account_key, validator_key};
use strata_types::vote_extension::DepositAttestation;

const SIG: &str = "stub";

struct HexAuth;

impl Authenticator for HexAuth {
    fn verify(&self, _identity: &[u8], _message: &[u8], _signature: &[u8]) -> Result<(), AuthError> {
        Ok(())
    }

    fn identifier(&self, identity: &[u8]) -> Result<String, AuthError> {
        Ok(hex::encode(identity))
    }
}

/// Writes a marker for every deploy, then fails if the schema says so.
struct MarkerEngine;

impl DatabaseEngine for MarkerEngine {
    fn create_dataset(
        &self,
        state: &mut dyn StateAccess,
        schema: &DeploySchema,
        _tx: &TxData<'_>,
    ) -> Result<String, strata_types::error::EngineError> {
        state.insert(format!("db::{}", schema.name).as_bytes(), b"1")?;
        if schema.schema.is_empty() {
            return Err(EngineError::Execution("empty schema".into()));
        }
        Ok(schema.name.clone())
    }

    fn delete_dataset(
        &self,
        _state: &mut dyn StateAccess,
        dbid: &str,
        _tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        Err(EngineError::DatasetNotFound(dbid.into()))
    }

    fn execute(
        &self,
        _state: &mut dyn StateAccess,
        _call: &ProcedureCall<'_>,
        _tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

struct Harness {
    router: Router,
    params: ConsensusParams,
    state: TestState,
    effects: LocalEffects,
}

impl Harness {
    fn new() -> Self {
        let params = ConsensusParams::default();
        let router = Router::standard(
            Arc::new(MarkerEngine),
            AuthRegistry::new().with(SIG, Arc::new(HexAuth)),
            ResolutionRegistry::with_defaults(&params),
        );
        Self {
            router,
            params,
            state: fresh(),
            effects: LocalEffects::new(),
        }
    }

    fn fund(&mut self, who: &[u8], balance: u128, nonce: u64) {
        self.state
            .put_encoded(&account_key(who), &AccountRecord { balance, nonce })
            .unwrap();
    }

    fn make_validator(&mut self, who: &[u8], power: u64) {
        self.state.put_encoded(&validator_key(who), &power).unwrap();
    }

    fn run(&mut self, tx: &Transaction, gas_enabled: bool, proposer: &[u8], local: &[u8]) -> TxResponse {
        let ctx = TxContext {
            block_height: 10,
            proposer,
            chain_id: "test-chain",
            tx_hash: [1; 32],
            gas_enabled,
            local_identity: local,
            params: &self.params,
        };
        self.router
            .execute(&ctx, &mut self.state, tx, &mut self.effects)
            .unwrap()
    }

    fn exec(&mut self, tx: &Transaction) -> TxResponse {
        self.run(tx, true, b"proposer", b"local")
    }

    fn account(&self, who: &[u8]) -> (u128, u64) {
        let a = accounts::get_account(&self.state, who).unwrap();
        (a.balance, a.nonce)
    }
}

fn signed<P: strata_types::app::Payload>(sender: &[u8], payload: &P, fee: u128, nonce: u64) -> Transaction {
    let mut tx = tx_from(sender, payload, fee, nonce);
    tx.signature.sig_type = SIG.into();
    tx
}

fn transfer(to: &[u8], amount: &str) -> Transfer {
    Transfer {
        to: to.to_vec(),
        amount: amount.into(),
    }
}

#[test]
fn transfer_charges_price_and_moves_funds() {
    let mut h = Harness::new();
    h.fund(b"alice", 1_000_000, 0);
    let resp = h.exec(&signed(b"alice", &transfer(b"bob", "1000"), TRANSFER_PRICE, 1));
    assert_eq!(resp.code, TxCode::Ok);
    assert_eq!(resp.spend, TRANSFER_PRICE);
    assert_eq!(resp.events.len(), 1);
    assert_eq!(h.account(b"alice"), (1_000_000 - TRANSFER_PRICE - 1000, 1));
    assert_eq!(h.account(b"bob"), (1000, 0));
}

#[test]
fn low_fee_is_charged_and_skips_the_mutation() {
    let mut h = Harness::new();
    h.fund(b"alice", 1_000_000, 0);
    let resp = h.exec(&signed(b"alice", &transfer(b"bob", "1000"), 100, 1));
    assert_eq!(resp.code, TxCode::InsufficientFee);
    assert_eq!(resp.spend, 100);
    assert_eq!(h.account(b"alice"), (1_000_000 - 100, 1));
    assert_eq!(h.account(b"bob"), (0, 0));
}

#[test]
fn short_balance_is_emptied_and_nonce_consumed() {
    let mut h = Harness::new();
    h.fund(b"alice", 50, 3);
    let resp = h.exec(&signed(b"alice", &transfer(b"bob", "1"), TRANSFER_PRICE, 4));
    assert_eq!(resp.code, TxCode::InsufficientBalance);
    assert_eq!(resp.spend, 50);
    assert_eq!(h.account(b"alice"), (0, 4));
}

#[test]
fn missing_account_pays_nothing() {
    let mut h = Harness::new();
    let resp = h.exec(&signed(b"ghost", &transfer(b"bob", "1"), TRANSFER_PRICE, 1));
    assert_eq!(resp.code, TxCode::InsufficientBalance);
    assert_eq!(resp.spend, 0);
    assert!(h.state.get(&account_key(b"ghost")).unwrap().is_none());
}

#[test]
fn wrong_nonce_changes_nothing() {
    let mut h = Harness::new();
    h.fund(b"alice", 1_000_000, 0);
    let resp = h.exec(&signed(b"alice", &transfer(b"bob", "1"), TRANSFER_PRICE, 2));
    assert_eq!(resp.code, TxCode::InvalidNonce);
    assert_eq!(resp.spend, 0);
    assert_eq!(h.account(b"alice"), (1_000_000, 0));
}

#[test]
fn failed_mutation_keeps_fee_and_rolls_back_writes() {
    let mut h = Harness::new();
    h.fund(b"alice", 2 * DEPLOY_PRICE, 0);
    let bad = DeploySchema {
        name: "broken".into(),
        schema: Vec::new(),
    };
    let resp = h.exec(&signed(b"alice", &bad, DEPLOY_PRICE, 1));
    assert_eq!(resp.code, TxCode::UnknownError);
    assert_eq!(resp.spend, DEPLOY_PRICE);
    assert_eq!(h.account(b"alice"), (DEPLOY_PRICE, 1));
    assert!(h.state.get(b"db::broken").unwrap().is_none());

    let good = DeploySchema {
        name: "ok".into(),
        schema: b"table t".to_vec(),
    };
    let resp = h.exec(&signed(b"alice", &good, DEPLOY_PRICE, 2));
    assert_eq!(resp.code, TxCode::Ok);
    assert_eq!(h.state.get(b"db::ok").unwrap(), Some(b"1".to_vec()));
    assert_eq!(h.account(b"alice"), (0, 2));
}

#[test]
fn overdrawn_transfer_still_pays_fee() {
    let mut h = Harness::new();
    h.fund(b"alice", TRANSFER_PRICE + 10, 0);
    let resp = h.exec(&signed(b"alice", &transfer(b"bob", "11"), TRANSFER_PRICE, 1));
    assert_eq!(resp.code, TxCode::InsufficientBalance);
    assert_eq!(resp.spend, TRANSFER_PRICE);
    assert_eq!(h.account(b"alice"), (10, 1));
}

#[test]
fn unknown_payload_type_is_rejected_without_charge() {
    let mut h = Harness::new();
    h.fund(b"alice", 1_000_000, 0);
    let mut tx = signed(b"alice", &transfer(b"bob", "1"), TRANSFER_PRICE, 1);
    tx.body.payload_type = "mint_forever".into();
    let resp = h.exec(&tx);
    assert_eq!(resp.code, TxCode::InvalidTxType);
    assert_eq!(h.account(b"alice"), (1_000_000, 0));
}

#[test]
fn gas_disabled_prices_everything_at_zero() {
    let mut h = Harness::new();
    let tx = signed(b"fresh", &transfer(b"bob", "0"), 0, 1);
    let resp = h.run(&tx, false, b"proposer", b"local");
    assert_eq!(resp.code, TxCode::Ok);
    assert_eq!(resp.spend, 0);
    assert_eq!(h.account(b"fresh"), (0, 1));
    assert_eq!(h.router.price(
        &TxContext {
            block_height: 1,
            proposer: b"",
            chain_id: "",
            tx_hash: [0; 32],
            gas_enabled: false,
            local_identity: b"",
            params: &h.params,
        },
        &tx,
    ), Ok(0));
}

#[test]
fn join_then_approve_flow() {
    let mut h = Harness::new();
    h.make_validator(b"v1", 10);
    h.make_validator(b"v2", 10);
    for who in [&b"cand"[..], &b"v1"[..], &b"v2"[..]] {
        h.fund(who, 10 * VALIDATOR_LIFECYCLE_PRICE, 0);
    }

    let join = ValidatorJoin { power: 5 };
    let resp = h.exec(&signed(b"cand", &join, VALIDATOR_LIFECYCLE_PRICE, 1));
    assert_eq!(resp.code, TxCode::Ok, "{}", resp.log);
    let pending =
        voting::resolution_ids_by_type_and_proposer(&h.state, VALIDATOR_JOIN_EVENT, b"cand").unwrap();
    assert_eq!(pending.len(), 1);
    let record = voting::get_resolution(&h.state, &pending[0]).unwrap().unwrap();
    assert!(record.voters.is_empty());
    assert_eq!(record.expiration, 10 + h.params.join_vote_expiration);

    let resp = h.exec(&signed(b"cand", &join, VALIDATOR_LIFECYCLE_PRICE, 2));
    assert_eq!(resp.code, TxCode::InvalidSender);

    let approve = ValidatorApprove {
        candidate: b"cand".to_vec(),
    };
    let resp = h.exec(&signed(b"cand", &approve, VALIDATOR_LIFECYCLE_PRICE, 3));
    assert_eq!(resp.code, TxCode::InvalidSender);

    let resp = h.exec(&signed(b"v1", &approve, VALIDATOR_LIFECYCLE_PRICE, 1));
    assert_eq!(resp.code, TxCode::Ok, "{}", resp.log);
    let record = voting::get_resolution(&h.state, &pending[0]).unwrap().unwrap();
    assert_eq!(record.voters, vec![b"v1".to_vec()]);

    let nobody = ValidatorApprove {
        candidate: b"nobody".to_vec(),
    };
    let resp = h.exec(&signed(b"v2", &nobody, VALIDATOR_LIFECYCLE_PRICE, 1));
    assert_eq!(resp.code, TxCode::InvalidSender);
}

const VALIDATOR_JOIN_EVENT: &str = strata_types::app::VALIDATOR_JOIN_EVENT_TYPE;

fn deposit_event() -> VotableEvent {
    VotableEvent {
        event_type: DEPOSIT_EVENT_TYPE.into(),
        body: DepositAttestation {
            event_id: "0xdead".into(),
            account: hex::encode(b"alice"),
            amount: "500".into(),
        }
        .encode(),
    }
}

#[test]
fn vote_bodies_come_from_the_proposer_only() {
    let mut h = Harness::new();
    h.make_validator(b"v1", 10);
    h.make_validator(b"v2", 10);
    h.fund(b"v1", 1_000_000_000, 0);
    h.fund(b"v2", 1_000_000_000, 0);
    let event = deposit_event();
    let bodies = ValidatorVoteBodies {
        events: vec![event.clone()],
    };

    let tx = signed(b"v2", &bodies, 1_000_000_000, 1);
    let resp = h.run(&tx, true, b"v1", b"v1");
    assert_eq!(resp.code, TxCode::InvalidSender);

    let tx = signed(b"v1", &bodies, 1_000_000_000, 1);
    let resp = h.run(&tx, true, b"v1", b"v1");
    assert_eq!(resp.code, TxCode::Ok, "{}", resp.log);
    let record = voting::get_resolution(&h.state, &event.id()).unwrap().unwrap();
    assert_eq!(record.event.as_ref(), Some(&event));
    assert_eq!(record.voters, vec![b"v1".to_vec()]);
    assert_eq!(h.effects.ops(), &[crate::LocalOp::Delete(event.id())]);
}

#[test]
fn vote_ids_track_local_events() {
    let mut h = Harness::new();
    h.make_validator(b"v1", 10);
    h.fund(b"v1", 1_000_000_000, 0);
    let id = deposit_event().id();
    let votes = ValidatorVoteIds {
        resolution_ids: vec![id],
    };
    let tx = signed(b"v1", &votes, 1_000_000_000, 1);
    let resp = h.run(&tx, true, b"other", b"v1");
    assert_eq!(resp.code, TxCode::Ok, "{}", resp.log);
    assert_eq!(h.effects.ops(), &[crate::LocalOp::MarkReceived(id)]);
    let record = voting::get_resolution(&h.state, &id).unwrap().unwrap();
    assert!(record.event.is_none());
    assert_eq!(record.expiration, 10 + h.params.vote_expiry);

    voting::mark_processed(&mut h.state, &[id]).unwrap();
    let tx = signed(b"v1", &votes, 1_000_000_000, 2);
    let resp = h.run(&tx, true, b"other", b"v1");
    assert_eq!(resp.code, TxCode::Ok);
    assert_eq!(h.effects.ops().last(), Some(&crate::LocalOp::Delete(id)));
}

#[test]
fn non_validators_cannot_vote() {
    let mut h = Harness::new();
    h.fund(b"rando", 1_000_000_000, 0);
    let votes = ValidatorVoteIds {
        resolution_ids: vec![deposit_event().id()],
    };
    let resp = h.exec(&signed(b"rando", &votes, 1_000_000_000, 1));
    assert_eq!(resp.code, TxCode::InvalidSender);
    assert_eq!(h.account(b"rando").1, 1);
    assert!(h.effects.is_empty());
}

#[derive(Debug, Clone)]
enum Step {
    Pay { fee: u128, amount: u128 },
    Replay,
}

fn step() -> impl proptest::strategy::Strategy<Value = Step> {
    use proptest::prelude::*;
    prop_oneof![
        6 => (prop_oneof![Just(TRANSFER_PRICE), 0..TRANSFER_PRICE], 1u128..600_000)
            .prop_map(|(fee, amount)| Step::Pay { fee, amount }),
        1 => Just(Step::Replay),
    ]
}

proptest::proptest! {
    #[test]
    fn fees_and_transfers_account_for_every_unit(
        start in 0u128..3_000_000,
        steps in proptest::collection::vec(step(), 1..24),
    ) {
        let mut h = Harness::new();
        h.fund(b"alice", start, 0);
        let (mut accepted, mut spent, mut moved) = (0u64, 0u128, 0u128);

        for s in &steps {
            let (balance, _) = h.account(b"alice");
            let resp = match s {
                Step::Pay { fee, amount } => h.exec(&signed(
                    b"alice",
                    &transfer(b"bob", &amount.to_string()),
                    *fee,
                    accepted + 1,
                )),
                Step::Replay => h.exec(&signed(b"alice", &transfer(b"bob", "1"), TRANSFER_PRICE, accepted)),
            };
            match s {
                Step::Replay => {
                    proptest::prop_assert_eq!(resp.code, TxCode::InvalidNonce);
                    proptest::prop_assert_eq!(resp.spend, 0);
                }
                Step::Pay { fee, amount } => {
                    accepted += 1;
                    let charge = (*fee).min(TRANSFER_PRICE);
                    proptest::prop_assert_eq!(resp.spend, charge.min(balance));
                    let affordable = *fee >= TRANSFER_PRICE && balance >= TRANSFER_PRICE + amount;
                    proptest::prop_assert_eq!(resp.code == TxCode::Ok, affordable, "{}", resp.log);
                    if affordable {
                        moved += amount;
                    }
                }
            }
            spent += resp.spend;

            let (balance, nonce) = h.account(b"alice");
            proptest::prop_assert_eq!(nonce, accepted);
            proptest::prop_assert_eq!(start - balance, spent + moved);
            proptest::prop_assert_eq!(h.account(b"bob"), (moved, 0));
        }
    }
}
