// Path: crates/node/src/engine.rs
//! The dataset registry the node runs when no external SQL engine is attached.
//!
//! Deployments, ownership and drops are tracked in consensus state; action
//! calls are checked against the registry and otherwise accepted.

use parity_scale_codec::{Decode, Encode};
use strata_api::engine::{DatabaseEngine, ProcedureCall, TxData};
use strata_api::state::{StateAccess, StateReadExt, StateWriteExt};
use strata_crypto::algorithms::hash::sha256_parts;
use strata_types::app::DeploySchema;
use strata_types::error::EngineError;

pub const DATASET_KEY_PREFIX: &[u8] = b"engine::dataset::";

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub owner: String,
    pub name: String,
    pub schema: Vec<u8>,
}

fn dataset_key(dbid: &str) -> Vec<u8> {
    [DATASET_KEY_PREFIX, dbid.as_bytes()].concat()
}

/// The id of dataset `name` deployed by `owner`: `x` followed by 28 hex-encoded
/// digest bytes.
pub fn dataset_id(name: &str, owner: &str) -> String {
    let lowered = name.to_lowercase();
    let digest = sha256_parts([lowered.as_bytes(), owner.as_bytes()]);
    let hex = hex::encode(digest);
    format!("x{}", hex.get(..56).unwrap_or(&hex))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetRegistry;

impl DatasetRegistry {
    fn load(state: &dyn StateAccess, dbid: &str) -> Result<DatasetRecord, EngineError> {
        state
            .get_decoded::<DatasetRecord>(&dataset_key(dbid))?
            .ok_or_else(|| EngineError::DatasetNotFound(dbid.to_string()))
    }
}

impl DatabaseEngine for DatasetRegistry {
    fn create_dataset(
        &self,
        state: &mut dyn StateAccess,
        schema: &DeploySchema,
        tx: &TxData<'_>,
    ) -> Result<String, EngineError> {
        let dbid = dataset_id(&schema.name, tx.caller);
        let key = dataset_key(&dbid);
        if state.get(&key)?.is_some() {
            return Err(EngineError::DatasetExists(dbid));
        }
        state.put_encoded(
            &key,
            &DatasetRecord {
                owner: tx.caller.to_string(),
                name: schema.name.clone(),
                schema: schema.schema.clone(),
            },
        )?;
        tracing::debug!(target: "engine", dbid = %dbid, owner = tx.caller, "dataset deployed");
        Ok(dbid)
    }

    fn delete_dataset(
        &self,
        state: &mut dyn StateAccess,
        dbid: &str,
        tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        let record = Self::load(state, dbid)?;
        if record.owner != tx.caller {
            return Err(EngineError::Unauthorized(format!(
                "{} does not own {}",
                tx.caller, dbid
            )));
        }
        state.delete(&dataset_key(dbid))?;
        Ok(())
    }

    fn execute(
        &self,
        state: &mut dyn StateAccess,
        call: &ProcedureCall<'_>,
        _tx: &TxData<'_>,
    ) -> Result<(), EngineError> {
        Self::load(state, call.dbid)?;
        if call.action.is_empty() {
            return Err(EngineError::Execution("empty action name".into()));
        }
        Ok(())
    }
}
