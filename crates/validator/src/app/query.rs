// Path: crates/validator/src/app/query.rs
//! Read-only queries over committed state, answered as JSON.
//!
//! Paths: `chain`, `account/<hex>`, `validators`, `resolution/<hex id>` and
//! `resolutions/<type>`.

use serde::Serialize;
use strata_api::state::{StateRead, StateReadExt};
use strata_tx::system::{accounts, voting};
use strata_types::app::{ChainStatus, QueryResponse, ResolutionId};
use strata_types::keys::CHAIN_STATUS_KEY;
use thiserror::Error;

pub const CODE_OK: u32 = 0;
pub const CODE_BAD_REQUEST: u32 = 1;
pub const CODE_NOT_FOUND: u32 = 2;
pub const CODE_INTERNAL: u32 = 3;

#[derive(Error, Debug)]
enum QueryError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl QueryError {
    fn code(&self) -> u32 {
        match self {
            Self::BadRequest(_) => CODE_BAD_REQUEST,
            Self::NotFound(_) => CODE_NOT_FOUND,
            Self::Internal(_) => CODE_INTERNAL,
        }
    }
}

fn internal(e: impl std::fmt::Display) -> QueryError {
    QueryError::Internal(e.to_string())
}

#[derive(Serialize)]
struct ChainInfo<'a> {
    chain_id: &'a str,
    height: u64,
    app_hash: String,
}

/// Answers `path` against `state`. Failures are reported in the response code.
pub fn answer<S: StateRead + ?Sized>(state: &S, chain_id: &str, path: &str) -> QueryResponse {
    let status = state
        .get_decoded::<ChainStatus>(CHAIN_STATUS_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    match route(state, chain_id, &status, path.trim_matches('/')) {
        Ok(value) => QueryResponse {
            code: CODE_OK,
            value,
            log: String::new(),
            height: status.height,
        },
        Err(e) => {
            tracing::debug!(target: "consensus_app", path, error = %e, "query failed");
            QueryResponse {
                code: e.code(),
                value: Vec::new(),
                log: e.to_string(),
                height: status.height,
            }
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, QueryError> {
    serde_json::to_vec(value).map_err(internal)
}

fn route<S: StateRead + ?Sized>(
    state: &S,
    chain_id: &str,
    status: &ChainStatus,
    path: &str,
) -> Result<Vec<u8>, QueryError> {
    let (head, arg) = match path.split_once('/') {
        Some((head, arg)) => (head, Some(arg)),
        None => (path, None),
    };
    match (head, arg) {
        ("chain", None) => json(&ChainInfo {
            chain_id,
            height: status.height,
            app_hash: hex::encode(&status.app_hash),
        }),
        ("account", Some(id)) => {
            let identity = hex::decode(id.trim_start_matches("0x"))
                .map_err(|e| QueryError::BadRequest(format!("account id: {}", e)))?;
            json(&accounts::get_account(state, &identity).map_err(internal)?)
        }
        ("validators", None) => json(&voting::validators(state).map_err(internal)?),
        ("resolution", Some(id)) => {
            let id = ResolutionId::from_hex(id).map_err(QueryError::BadRequest)?;
            let record = voting::get_resolution(state, &id)
                .map_err(internal)?
                .ok_or_else(|| QueryError::NotFound(format!("resolution {}", id)))?;
            json(&voting::resolution_info(state, &record).map_err(internal)?)
        }
        ("resolutions", Some(event_type)) => {
            let infos = voting::resolutions_by_type(state, event_type)
                .map_err(internal)?
                .iter()
                .map(|r| voting::resolution_info(state, r))
                .collect::<Result<Vec<_>, _>>()
                .map_err(internal)?;
            json(&infos)
        }
        _ => Err(QueryError::BadRequest(format!("unknown query path '{}'", path))),
    }
}
