// Path: crates/test_utils/src/engine.rs
//! A [`DatabaseEngine`] that records every call it receives.
//!
//! Successful calls also write a marker key into the state scope they were
//! given, so tests can observe whether the surrounding route kept or rolled
//! back the engine's writes.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use strata_api::engine::{DatabaseEngine, ProcedureCall, TxData};
use strata_api::state::StateAccess;
use strata_types::app::DeploySchema;
use strata_types::error::EngineError;

/// Prefix of the marker keys written by [`RecordingEngine`].
pub const MARKER_PREFIX: &[u8] = b"test::engine::";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create { dbid: String, caller: String },
    Delete { dbid: String, caller: String },
    Execute {
        dbid: String,
        action: String,
        args: Vec<String>,
        caller: String,
    },
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    failing_actions: Mutex<BTreeSet<String>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `action` fail.
    pub fn fail_action(&self, action: &str) {
        self.failing_actions.lock().insert(action.to_string());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// The dataset id assigned to `name` deployed by `caller`.
    pub fn dbid(name: &str, caller: &str) -> String {
        format!("x{}_{}", name.to_lowercase(), caller.get(..8).unwrap_or(caller))
    }

    fn mark(state: &mut dyn StateAccess, tx: &TxData<'_>) -> Result<(), EngineError> {
        let key = [MARKER_PREFIX, tx.tx_id.as_bytes()].concat();
        state.insert(&key, tx.caller.as_bytes())?;
        Ok(())
    }
}

impl DatabaseEngine for RecordingEngine {
    fn create_dataset(
        &self,
        state: &mut dyn StateAccess,
        schema: &DeploySchema,
        tx: &TxData<'_>,
    ) -> Result<String, EngineError> {
        let dbid = Self::dbid(&schema.name, tx.caller);
        self.calls.lock().push(EngineCall::Create {
            dbid: dbid.clone(),
            caller: tx.caller.to_string(),
        });
        Self::mark(state, tx)?;
        Ok(dbid)
    }

    fn delete_dataset(
        &self,
        state: &mut dyn StateAccess,
        dbid: &str,
        tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        self.calls.lock().push(EngineCall::Delete {
            dbid: dbid.to_string(),
            caller: tx.caller.to_string(),
        });
        Self::mark(state, tx)
    }

    fn execute(
        &self,
        state: &mut dyn StateAccess,
        call: &ProcedureCall<'_>,
        tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        self.calls.lock().push(EngineCall::Execute {
            dbid: call.dbid.to_string(),
            action: call.action.to_string(),
            args: call.args.to_vec(),
            caller: tx.caller.to_string(),
        });
        if self.failing_actions.lock().contains(call.action) {
            return Err(EngineError::Execution(format!(
                "action '{}' is set to fail",
                call.action
            )));
        }
        Self::mark(state, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_api::state::{StateOverlay, StateRead};
    use strata_storage::{MemoryStore, StoreView};

    fn tx_data<'a>(caller: &'a str, tx_id: &'a str) -> TxData<'a> {
        TxData {
            signer: b"signer",
            caller,
            tx_id,
        }
    }

    #[test]
    fn records_calls_and_marks_state() {
        let engine = RecordingEngine::new();
        let view = StoreView::new(Arc::new(MemoryStore::new()));
        let mut state = StateOverlay::new(&view);
        let schema = DeploySchema {
            name: "Ledger".into(),
            schema: vec![],
        };
        let dbid = engine
            .create_dataset(&mut state, &schema, &tx_data("abcdef0123", "t1"))
            .unwrap();
        assert_eq!(dbid, "xledger_abcdef01");

        let args = vec!["1".to_string()];
        let call = ProcedureCall {
            dbid: &dbid,
            action: "insert",
            args: &args,
        };
        engine.execute(&mut state, &call, &tx_data("abcdef0123", "t2")).unwrap();
        engine.fail_action("insert");
        assert!(engine
            .execute(&mut state, &call, &tx_data("abcdef0123", "t3"))
            .is_err());

        assert_eq!(engine.calls().len(), 3);
        assert!(state.get(&[MARKER_PREFIX, b"t2"].concat()).unwrap().is_some());
        assert!(state.get(&[MARKER_PREFIX, b"t3"].concat()).unwrap().is_none());
    }
}
