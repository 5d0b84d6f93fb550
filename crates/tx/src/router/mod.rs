// Path: crates/tx/src/router/mod.rs

//! Payload routing and the spend-then-execute pattern.
//!
//! Every transaction runs in two nested scopes over the block scope:
//!
//! 1. A fee scope, in which the price is checked and charged and the nonce
//!    consumed. If the sender cannot pay in full, whatever it can pay is
//!    charged and the scope is still kept.
//! 2. A mutation scope inside the fee scope, which holds the route's writes.
//!    It is kept only if the route succeeds, so a failed mutation leaves the
//!    fee charged and nothing else.

use crate::effects::LocalEffects;
use crate::routes::{database::DatabaseRoute, transfer::TransferRoute, validators, votes};
use crate::system::accounts;
use crate::system::resolutions::ResolutionRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_api::engine::DatabaseEngine;
use strata_api::identity::AuthRegistry;
use strata_api::state::{apply_changeset, StateAccess, StateOverlay};
use strata_api::transaction::context::TxContext;
use strata_types::app::{Event, ExecTxResult, PayloadKind, Transaction};
use strata_types::error::{LedgerError, StateError, TransactionError, TxCode};

/// The pricing and execution handler for one payload type.
pub trait Route: Send + Sync {
    /// The payload type this route handles.
    fn kind(&self) -> PayloadKind;

    /// The gas-enabled price of `tx`.
    fn price(&self, ctx: &TxContext<'_>, tx: &Transaction) -> Result<u128, TransactionError>;

    /// Applies the payload. Runs only after the price was charged in full.
    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError>;
}

/// The outcome of one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResponse {
    pub code: TxCode,
    /// What was actually charged.
    pub spend: u128,
    pub log: String,
    pub events: Vec<Event>,
}

impl TxResponse {
    fn failed(code: TxCode, spend: u128, log: impl Into<String>) -> Self {
        Self {
            code,
            spend,
            log: log.into(),
            events: Vec::new(),
        }
    }

    /// The result reported to the consensus engine.
    pub fn into_exec_result(self) -> ExecTxResult {
        ExecTxResult {
            code: self.code.as_u32(),
            log: self.log,
            gas_used: self.spend,
            events: self.events,
        }
    }
}

struct SpendFailure {
    spent: u128,
    code: TxCode,
    log: String,
}

impl SpendFailure {
    fn new(spent: u128, code: TxCode, log: impl Into<String>) -> Self {
        Self {
            spent,
            code,
            log: log.into(),
        }
    }

    fn from_ledger(err: LedgerError) -> Self {
        let err = TransactionError::from(err);
        Self::new(0, err.tx_code(), err.to_string())
    }

    /// Whether the fee scope is kept despite the failure.
    fn keeps_fee_scope(&self) -> bool {
        matches!(
            self.code,
            TxCode::Ok | TxCode::InsufficientBalance | TxCode::InsufficientFee
        )
    }
}

/// Maps payload types to routes. Populated once at startup.
#[derive(Clone, Default)]
pub struct Router {
    routes: BTreeMap<PayloadKind, Arc<dyn Route>>,
}

impl Router {
    /// A router with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A router with every built-in route.
    pub fn standard(
        engine: Arc<dyn DatabaseEngine>,
        auth: AuthRegistry,
        resolutions: ResolutionRegistry,
    ) -> Self {
        let mut router = Self::new();
        for kind in [
            PayloadKind::DeploySchema,
            PayloadKind::DropSchema,
            PayloadKind::Execute,
        ] {
            router.register(Arc::new(DatabaseRoute::new(
                kind,
                engine.clone(),
                auth.clone(),
            )));
        }
        router.register(Arc::new(TransferRoute));
        router.register(Arc::new(validators::JoinRoute));
        router.register(Arc::new(validators::ApproveRoute));
        router.register(Arc::new(validators::RemoveRoute));
        router.register(Arc::new(validators::LeaveRoute));
        router.register(Arc::new(votes::VoteIdsRoute));
        router.register(Arc::new(votes::VoteBodiesRoute::new(resolutions)));
        router
    }

    /// Registers a route, replacing any previous route for its kind.
    pub fn register(&mut self, route: Arc<dyn Route>) {
        self.routes.insert(route.kind(), route);
    }

    /// The route for a payload-type tag.
    pub fn route(&self, payload_type: &str) -> Option<&Arc<dyn Route>> {
        PayloadKind::parse(payload_type).and_then(|kind| self.routes.get(&kind))
    }

    /// Whether a route handles this payload-type tag.
    pub fn handles(&self, payload_type: &str) -> bool {
        self.route(payload_type).is_some()
    }

    /// The effective price of `tx`: 0 when gas is disabled.
    pub fn price(&self, ctx: &TxContext<'_>, tx: &Transaction) -> Result<u128, TransactionError> {
        let route = self
            .route(&tx.body.payload_type)
            .ok_or_else(|| TransactionError::UnknownPayloadType(tx.body.payload_type.clone()))?;
        effective_price(route.as_ref(), ctx, tx)
    }

    /// Executes one transaction against the block scope.
    ///
    /// Per-transaction failures are reported in the response. An `Err` means
    /// the block scope itself could not be written and is fatal.
    pub fn execute(
        &self,
        ctx: &TxContext<'_>,
        block: &mut dyn StateAccess,
        tx: &Transaction,
        effects: &mut LocalEffects,
    ) -> Result<TxResponse, StateError> {
        let Some(route) = self.route(&tx.body.payload_type) else {
            return Ok(TxResponse::failed(
                TxCode::InvalidTxType,
                0,
                format!("unknown payload type '{}'", tx.body.payload_type),
            ));
        };

        let mut fee_scope = StateOverlay::new(&*block);
        let spent = match check_and_spend(route.as_ref(), ctx, &mut fee_scope, tx) {
            Ok(spent) => spent,
            Err(failure) => {
                if failure.keeps_fee_scope() {
                    let changes = fee_scope.into_ordered_batch();
                    apply_changeset(block, &changes)?;
                }
                tracing::debug!(
                    target: "router",
                    code = failure.code.label(),
                    spent = %failure.spent,
                    "fee check failed: {}",
                    failure.log
                );
                return Ok(TxResponse::failed(failure.code, failure.spent, failure.log));
            }
        };

        let mut local = LocalEffects::new();
        let mut mutation = StateOverlay::new(&fee_scope);
        let response = match route.execute(ctx, &mut mutation, tx, &mut local) {
            Ok(events) => {
                let changes = mutation.into_ordered_batch();
                apply_changeset(&mut fee_scope, &changes)?;
                effects.extend(local);
                TxResponse {
                    code: TxCode::Ok,
                    spend: spent,
                    log: String::new(),
                    events,
                }
            }
            Err(err) => {
                tracing::debug!(
                    target: "router",
                    payload_type = %tx.body.payload_type,
                    error = %err,
                    "mutation failed, fee kept"
                );
                TxResponse::failed(err.tx_code(), spent, err.to_string())
            }
        };

        let changes = fee_scope.into_ordered_batch();
        apply_changeset(block, &changes)?;
        Ok(response)
    }
}

fn effective_price(
    route: &dyn Route,
    ctx: &TxContext<'_>,
    tx: &Transaction,
) -> Result<u128, TransactionError> {
    if ctx.gas_enabled {
        route.price(ctx, tx)
    } else {
        Ok(0)
    }
}

/// Charges the price and consumes the nonce, returning the amount charged.
///
/// A fee below the price charges the fee and fails with `InsufficientFee`.
/// A balance below the charge empties the account and fails with
/// `InsufficientBalance`. Both failures keep the nonce consumed.
fn check_and_spend(
    route: &dyn Route,
    ctx: &TxContext<'_>,
    state: &mut dyn StateAccess,
    tx: &Transaction,
) -> Result<u128, SpendFailure> {
    let price = effective_price(route, ctx, tx)
        .map_err(|e| SpendFailure::new(0, e.tx_code(), e.to_string()))?;
    let sender = tx.sender.as_slice();
    let nonce = tx.body.nonce;
    let fee = tx.body.fee;

    let charge = if fee < price { fee } else { price };
    match accounts::spend(state, sender, charge, nonce) {
        Ok(()) if fee < price => Err(SpendFailure::new(
            fee,
            TxCode::InsufficientFee,
            format!("fee {} is below the price {}", fee, price),
        )),
        Ok(()) => Ok(price),
        Err(LedgerError::InsufficientFunds { available, .. }) => {
            accounts::spend(state, sender, available, nonce).map_err(SpendFailure::from_ledger)?;
            Err(SpendFailure::new(
                available,
                TxCode::InsufficientBalance,
                format!("charge {} exceeds balance {}", charge, available),
            ))
        }
        Err(LedgerError::AccountNotFound(_)) => Err(SpendFailure::new(
            0,
            TxCode::InsufficientBalance,
            "account has zero balance",
        )),
        Err(err) => Err(SpendFailure::from_ledger(err)),
    }
}

#[cfg(test)]
mod tests;
