// Path: crates/types/src/app/account.rs
//! Accounts and validators as stored in consensus state.

use crate::app::serde_util::{decimal_u128, hex_bytes};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The persisted balance and nonce of an identity.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountRecord {
    /// The spendable balance.
    #[serde(with = "decimal_u128")]
    pub balance: u128,
    /// The nonce of the last sequenced transaction. Starts at 0.
    pub nonce: u64,
}

/// An account together with its identifier, for queries and the mempool.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// The account identity.
    #[serde(with = "hex_bytes")]
    pub identifier: Vec<u8>,
    /// The spendable balance.
    #[serde(with = "decimal_u128")]
    pub balance: u128,
    /// The nonce of the last sequenced transaction.
    pub nonce: u64,
}

impl Account {
    /// Builds an account view from a stored record.
    pub fn from_record(identifier: &[u8], record: AccountRecord) -> Self {
        Self {
            identifier: identifier.to_vec(),
            balance: record.balance,
            nonce: record.nonce,
        }
    }

    /// Whether the account has never been funded or used.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.nonce == 0
    }
}

/// A validator and its voting power. Power 0 means "not a validator".
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Validator {
    /// The validator's public key.
    #[serde(with = "hex_bytes")]
    pub pub_key: Vec<u8>,
    /// The voting power.
    pub power: u64,
}
