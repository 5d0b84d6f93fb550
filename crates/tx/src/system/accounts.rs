// Path: crates/tx/src/system/accounts.rs

//! The account ledger: balances and nonces keyed by identity.
//!
//! All functions operate on whatever scope they are handed, so a spend made
//! inside a fee scope is discarded with it.

use strata_api::state::{StateAccess, StateRead, StateReadExt, StateWriteExt};
use strata_types::app::{Account, AccountRecord};
use strata_types::error::LedgerError;
use strata_types::keys::account_key;

/// Reads an account record, `None` if the identity never held a balance.
pub fn get_record<S: StateRead + ?Sized>(
    state: &S,
    identifier: &[u8],
) -> Result<Option<AccountRecord>, LedgerError> {
    Ok(state.get_decoded::<AccountRecord>(&account_key(identifier))?)
}

/// Reads an account, returning an empty account for unknown identities.
pub fn get_account<S: StateRead + ?Sized>(
    state: &S,
    identifier: &[u8],
) -> Result<Account, LedgerError> {
    let record = get_record(state, identifier)?.unwrap_or_default();
    Ok(Account::from_record(identifier, record))
}

fn put_record<S: StateAccess + ?Sized>(
    state: &mut S,
    identifier: &[u8],
    record: &AccountRecord,
) -> Result<(), LedgerError> {
    state.put_encoded(&account_key(identifier), record)?;
    Ok(())
}

/// Adds `amount` to an account, creating it if needed.
pub fn credit<S: StateAccess + ?Sized>(
    state: &mut S,
    identifier: &[u8],
    amount: u128,
) -> Result<(), LedgerError> {
    let mut record = get_record(state, identifier)?.unwrap_or_default();
    record.balance = record
        .balance
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;
    put_record(state, identifier, &record)
}

/// Charges `amount` and advances the nonce to `nonce`.
///
/// The nonce must be exactly one past the stored nonce. A missing account
/// can only be spent from at nonce 1 for a zero amount, which creates it.
pub fn spend<S: StateAccess + ?Sized>(
    state: &mut S,
    identifier: &[u8],
    amount: u128,
    nonce: u64,
) -> Result<(), LedgerError> {
    let record = match get_record(state, identifier)? {
        Some(record) => record,
        None if amount == 0 && nonce == 1 => AccountRecord::default(),
        None => return Err(LedgerError::AccountNotFound(hex::encode(identifier))),
    };
    let expected = record.nonce.checked_add(1).ok_or(LedgerError::Overflow)?;
    if nonce != expected {
        return Err(LedgerError::InvalidNonce {
            expected,
            got: nonce,
        });
    }
    let balance = record
        .balance
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientFunds {
            required: amount,
            available: record.balance,
        })?;
    put_record(state, identifier, &AccountRecord { balance, nonce })
}

/// Moves `amount` from `from` to `to`. Nonces are untouched.
pub fn transfer<S: StateAccess + ?Sized>(
    state: &mut S,
    from: &[u8],
    to: &[u8],
    amount: u128,
) -> Result<(), LedgerError> {
    let mut sender = get_record(state, from)?
        .ok_or_else(|| LedgerError::AccountNotFound(hex::encode(from)))?;
    sender.balance = sender
        .balance
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientFunds {
            required: amount,
            available: sender.balance,
        })?;
    put_record(state, from, &sender)?;
    // Read the receiver after the debit so a self-transfer nets to zero.
    credit(state, to, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fresh, TestState};

    fn view(state: &TestState, id: &[u8]) -> (u128, u64) {
        let a = get_account(state, id).unwrap();
        (a.balance, a.nonce)
    }

    #[test]
    fn unknown_account_reads_as_empty() {
        let state = fresh();
        let acct = get_account(&state, b"nobody").unwrap();
        assert!(acct.is_empty());
        assert_eq!(acct.identifier, b"nobody".to_vec());
        assert!(get_record(&state, b"nobody").unwrap().is_none());
    }

    #[test]
    fn spend_requires_the_next_nonce() {
        let mut state = fresh();
        credit(&mut state, b"a", 100).unwrap();
        assert_eq!(
            spend(&mut state, b"a", 10, 2),
            Err(LedgerError::InvalidNonce {
                expected: 1,
                got: 2
            })
        );
        spend(&mut state, b"a", 10, 1).unwrap();
        spend(&mut state, b"a", 0, 2).unwrap();
        assert_eq!(view(&state, b"a"), (90, 2));
    }

    #[test]
    fn spend_reports_insufficient_funds_without_writing() {
        let mut state = fresh();
        credit(&mut state, b"a", 5).unwrap();
        assert_eq!(
            spend(&mut state, b"a", 6, 1),
            Err(LedgerError::InsufficientFunds {
                required: 6,
                available: 5
            })
        );
        assert_eq!(view(&state, b"a"), (5, 0));
    }

    #[test]
    fn zero_spend_at_nonce_one_creates_the_account() {
        let mut state = fresh();
        assert!(matches!(
            spend(&mut state, b"new", 1, 1),
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(matches!(
            spend(&mut state, b"new", 0, 2),
            Err(LedgerError::AccountNotFound(_))
        ));
        spend(&mut state, b"new", 0, 1).unwrap();
        assert_eq!(
            get_record(&state, b"new").unwrap(),
            Some(AccountRecord {
                balance: 0,
                nonce: 1
            })
        );
    }

    #[test]
    fn credit_overflow_is_an_error() {
        let mut state = fresh();
        credit(&mut state, b"a", u128::MAX).unwrap();
        assert_eq!(credit(&mut state, b"a", 1), Err(LedgerError::Overflow));
    }

    #[test]
    fn transfers_move_balance_and_keep_nonces() {
        let mut state = fresh();
        credit(&mut state, b"a", 100).unwrap();
        spend(&mut state, b"a", 0, 1).unwrap();
        transfer(&mut state, b"a", b"b", 40).unwrap();
        assert_eq!(view(&state, b"a"), (60, 1));
        assert_eq!(view(&state, b"b"), (40, 0));

        transfer(&mut state, b"a", b"a", 60).unwrap();
        assert_eq!(view(&state, b"a"), (60, 1));

        assert!(matches!(
            transfer(&mut state, b"b", b"a", 41),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            transfer(&mut state, b"ghost", b"a", 0),
            Err(LedgerError::AccountNotFound(_))
        ));
    }
}
