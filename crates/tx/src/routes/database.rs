// Path: crates/tx/src/routes/database.rs
//! Dataset deploy, drop and action execution, forwarded to the database engine.

use crate::effects::LocalEffects;
use crate::pricing::{per_unit, DEPLOY_PRICE, DROP_PRICE, EXECUTE_CALL_PRICE};
use crate::router::Route;
use std::sync::Arc;
use strata_api::engine::{DatabaseEngine, ProcedureCall, TxData};
use strata_api::identity::AuthRegistry;
use strata_api::state::StateAccess;
use strata_api::transaction::context::TxContext;
use strata_types::app::{ActionExecution, DeploySchema, DropSchema, Event, PayloadKind, Transaction};
use strata_types::error::TransactionError;

/// One of the three dataset payloads.
pub struct DatabaseRoute {
    kind: PayloadKind,
    engine: Arc<dyn DatabaseEngine>,
    auth: AuthRegistry,
}

impl DatabaseRoute {
    pub fn new(kind: PayloadKind, engine: Arc<dyn DatabaseEngine>, auth: AuthRegistry) -> Self {
        Self { kind, engine, auth }
    }

    fn caller(&self, tx: &Transaction) -> Result<String, TransactionError> {
        self.auth
            .identifier(&tx.signature.sig_type, &tx.sender)
            .map_err(|e| TransactionError::Internal(format!("caller identifier: {}", e)))
    }
}

impl Route for DatabaseRoute {
    fn kind(&self) -> PayloadKind {
        self.kind
    }

    fn price(&self, _ctx: &TxContext<'_>, tx: &Transaction) -> Result<u128, TransactionError> {
        match self.kind {
            PayloadKind::DeploySchema => Ok(DEPLOY_PRICE),
            PayloadKind::DropSchema => Ok(DROP_PRICE),
            _ => {
                let exec: ActionExecution = tx.decode_payload()?;
                Ok(per_unit(EXECUTE_CALL_PRICE, exec.call_count()))
            }
        }
    }

    fn execute(
        &self,
        ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let caller = self.caller(tx)?;
        let tx_id = ctx.tx_id();
        let data = TxData {
            signer: &tx.sender,
            caller: &caller,
            tx_id: &tx_id,
        };

        match self.kind {
            PayloadKind::DeploySchema => {
                let schema: DeploySchema = tx.decode_payload()?;
                let dbid = self.engine.create_dataset(state, &schema, &data)?;
                Ok(vec![Event::new(
                    "deploy_schema",
                    [("dbid", dbid), ("owner", caller.clone())],
                )])
            }
            PayloadKind::DropSchema => {
                let payload: DropSchema = tx.decode_payload()?;
                self.engine.delete_dataset(state, &payload.dbid, &data)?;
                Ok(vec![Event::new("drop_schema", [("dbid", payload.dbid)])])
            }
            _ => {
                let exec: ActionExecution = tx.decode_payload()?;
                let no_args: Vec<String> = Vec::new();
                let arg_sets: Vec<&[String]> = if exec.arguments.is_empty() {
                    vec![no_args.as_slice()]
                } else {
                    exec.arguments.iter().map(Vec::as_slice).collect()
                };
                for args in &arg_sets {
                    let call = ProcedureCall {
                        dbid: &exec.dbid,
                        action: &exec.action,
                        args,
                    };
                    self.engine.execute(state, &call, &data)?;
                }
                Ok(vec![Event::new(
                    "execute",
                    [
                        ("dbid", exec.dbid.clone()),
                        ("action", exec.action.clone()),
                        ("calls", arg_sets.len().to_string()),
                    ],
                )])
            }
        }
    }
}
