// Path: crates/node/tests/chain_e2e.rs

use anyhow::{anyhow, Result};
use strata_api::consensus::ConsensusApplication;
use strata_crypto::algorithms::hash::validator_address;
use strata_test_utils::fixtures::{deposit_event, key};
use strata_test_utils::{assert_block_ok, assert_tx_code, TestNode};
use strata_types::app::{
    CheckTxKind, CheckTxRequest, Misbehavior, MisbehaviorKind, PayloadKind, Transaction,
    Validator, ValidatorApprove, ValidatorJoin,
};
use strata_types::error::TxCode;

async fn balance(node: &TestNode, identity: &[u8]) -> Result<(String, u64)> {
    let account = node
        .query_json(&format!("account/{}", hex::encode(identity)))
        .await?;
    Ok((
        account["balance"].as_str().unwrap_or_default().to_string(),
        account["nonce"].as_u64().unwrap_or_default(),
    ))
}

#[tokio::test]
async fn gas_charges_fees_and_turns_away_unfunded_senders() -> Result<()> {
    let alice = key(2);
    let bob = key(3);
    let carol = key(4);
    let mut node = TestNode::builder()
        .gas(true)
        .fund(&alice.public_key(), 1_000_000)
        .build()
        .await?;
    let priced = node.txs().with_fee(210_000);
    let cheap = node.txs().with_fee(100);

    let unfunded = priced.transfer(&carol, &bob.public_key(), "1", 1)?;
    let resp = node
        .app
        .check_tx(CheckTxRequest {
            tx: unfunded.clone(),
            kind: CheckTxKind::New,
        })
        .await?;
    assert_tx_code!(resp, TxCode::InsufficientBalance);

    let resp = node
        .produce_block(vec![
            priced.transfer(&alice, &bob.public_key(), "1000", 1)?,
            cheap.transfer(&alice, &bob.public_key(), "5", 2)?,
            unfunded,
        ])
        .await?;
    assert_eq!(resp.tx_results.len(), 2);
    assert_tx_code!(resp.tx_results[0], TxCode::Ok);
    // The short fee is taken and the nonce consumed, but nothing moves.
    assert_tx_code!(resp.tx_results[1], TxCode::InsufficientFee);

    assert_eq!(balance(&node, &alice.public_key()).await?, ("788900".into(), 2));
    assert_eq!(balance(&node, &bob.public_key()).await?, ("1000".into(), 0));
    assert_eq!(balance(&node, &carol.public_key()).await?, ("0".into(), 0));
    Ok(())
}

#[tokio::test]
async fn joins_need_a_majority_and_misbehaviour_costs_power() -> Result<()> {
    let (v1, v2, candidate) = (key(1), key(2), key(3));
    let mut node = TestNode::builder()
        .validators(vec![(v1.clone(), 10), (v2.clone(), 10)])
        .build()
        .await?;
    let txs = node.txs();

    let resp = node
        .produce_block(vec![txs.wire(&candidate, &ValidatorJoin { power: 5 }, 1)?])
        .await?;
    assert_block_ok!(resp);
    assert!(resp.validator_updates.is_empty());

    let approve = ValidatorApprove {
        candidate: candidate.public_key().to_vec(),
    };
    let resp = node
        .produce_block(vec![txs.wire(&v1, &approve, 1)?, txs.wire(&v2, &approve, 1)?])
        .await?;
    assert_block_ok!(resp);
    assert_eq!(
        resp.validator_updates,
        vec![Validator {
            pub_key: candidate.public_key().to_vec(),
            power: 5,
        }]
    );
    let validators = node.query_json("validators").await?;
    assert_eq!(validators.as_array().map(Vec::len), Some(3));

    let resp = node
        .decide(
            Vec::new(),
            vec![Misbehavior {
                kind: MisbehaviorKind::DuplicateVote,
                validator_address: validator_address(&candidate.public_key()).to_vec(),
                height: 2,
            }],
        )
        .await?;
    assert_eq!(
        resp.validator_updates,
        vec![Validator {
            pub_key: candidate.public_key().to_vec(),
            power: 4,
        }]
    );
    assert_eq!(node.height(), 3);
    Ok(())
}

#[tokio::test]
async fn a_deposit_seen_by_two_validators_confirms_with_their_vote_ids() -> Result<()> {
    let (v1, v2, alice) = (key(1), key(2), key(5));
    let validators = vec![(v1, 10), (v2.clone(), 15)];
    let mut leader = TestNode::builder()
        .validators(validators.clone())
        .build()
        .await?;
    let mut follower = TestNode::builder()
        .validators(validators)
        .local(v2.clone())
        .build()
        .await?;
    let deposit = deposit_event("bridge-7", &alice.public_key(), 77);
    leader.app.observe_event(deposit.clone())?;
    follower.app.observe_event(deposit)?;
    let account = format!("account/{}", hex::encode(alice.public_key()));

    // The leader's body carries 10 of 25, short of the 13 a deposit needs.
    let block = leader.propose(Vec::new()).await?;
    assert_eq!(block.len(), 1);
    let led = leader.decide(block.clone(), Vec::new()).await?;
    let followed = follower.follow(block, leader.local_address()).await?;
    assert_block_ok!(led);
    assert_eq!(led.app_hash, followed.app_hash);
    assert_eq!(leader.query_json(&account).await?["balance"], "0");

    // Only the follower still holds the event, so only it votes.
    assert!(leader.app.take_vote_ids_tx().is_none());
    let votes = follower
        .app
        .take_vote_ids_tx()
        .ok_or_else(|| anyhow!("follower prepared no vote ids"))?;
    let tx = Transaction::from_wire(&votes)?;
    assert_eq!(tx.body.payload_kind(), Some(PayloadKind::ValidatorVoteIds));
    assert_eq!(tx.sender, v2.public_key().to_vec());

    let block = leader.propose(vec![votes]).await?;
    assert_eq!(block.len(), 1);
    let led = leader.decide(block.clone(), Vec::new()).await?;
    let followed = follower.follow(block, leader.local_address()).await?;
    assert_block_ok!(led);
    assert_eq!(led.app_hash, followed.app_hash);
    assert_eq!(leader.query_json(&account).await?["balance"], "77");
    assert_eq!(follower.query_json(&account).await?["balance"], "77");

    // Confirmed and pruned on both sides: nothing left to vote on.
    assert!(leader.app.take_vote_ids_tx().is_none());
    assert!(follower.app.take_vote_ids_tx().is_none());
    Ok(())
}
