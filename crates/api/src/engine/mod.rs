// Path: crates/api/src/engine/mod.rs

//! Defines the `DatabaseEngine` collaborator trait.
//!
//! The engine owns dataset semantics. The execution pipeline only forwards
//! decoded payloads, the caller identity and a state scope; everything the
//! engine writes goes into that scope so it is rolled back with the route's
//! mutation on failure.

use crate::state::StateAccess;
use strata_types::app::DeploySchema;
use strata_types::error::EngineError;

/// Transaction data passed to every engine call.
#[derive(Clone, Copy, Debug)]
pub struct TxData<'a> {
    /// The raw sender bytes.
    pub signer: &'a [u8],
    /// The authenticator's display identifier for the sender.
    pub caller: &'a str,
    /// The hex transaction hash.
    pub tx_id: &'a str,
}

/// One call of an action.
#[derive(Clone, Copy, Debug)]
pub struct ProcedureCall<'a> {
    /// The dataset id.
    pub dbid: &'a str,
    /// The action name.
    pub action: &'a str,
    /// The positional arguments.
    pub args: &'a [String],
}

/// The database engine collaborator.
pub trait DatabaseEngine: Send + Sync {
    /// Creates a dataset and returns its id.
    fn create_dataset(
        &self,
        state: &mut dyn StateAccess,
        schema: &DeploySchema,
        tx: &TxData<'_>,
    ) -> Result<String, EngineError>;

    /// Deletes a dataset.
    fn delete_dataset(
        &self,
        state: &mut dyn StateAccess,
        dbid: &str,
        tx: &TxData<'_>,
    ) -> Result<(), EngineError>;

    /// Executes one call of an action.
    fn execute(
        &self,
        state: &mut dyn StateAccess,
        call: &ProcedureCall<'_>,
        tx: &TxData<'_>,
    ) -> Result<(), EngineError>;
}
