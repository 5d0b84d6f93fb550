// Path: crates/tx/src/routes/transfer.rs
//! Value transfers between accounts.

use crate::effects::LocalEffects;
use crate::pricing::TRANSFER_PRICE;
use crate::router::Route;
use crate::system::accounts;
use strata_api::state::StateAccess;
use strata_api::transaction::context::TxContext;
use strata_types::app::{Event, PayloadKind, Transaction, Transfer};
use strata_types::error::TransactionError;

/// Parses a base-10 transfer amount. Signs, blanks and overflow are rejected.
pub fn parse_amount(raw: &str) -> Result<u128, TransactionError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(TransactionError::InvalidAmount(format!(
            "negative amount {}",
            raw
        )));
    }
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransactionError::InvalidAmount(format!(
            "malformed amount '{}'",
            raw
        )));
    }
    trimmed
        .parse::<u128>()
        .map_err(|e| TransactionError::InvalidAmount(format!("{}: {}", raw, e)))
}

pub struct TransferRoute;

impl Route for TransferRoute {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Transfer
    }

    fn price(&self, _ctx: &TxContext<'_>, _tx: &Transaction) -> Result<u128, TransactionError> {
        Ok(TRANSFER_PRICE)
    }

    fn execute(
        &self,
        _ctx: &TxContext<'_>,
        state: &mut dyn StateAccess,
        tx: &Transaction,
        _effects: &mut LocalEffects,
    ) -> Result<Vec<Event>, TransactionError> {
        let transfer: Transfer = tx.decode_payload()?;
        let amount = parse_amount(&transfer.amount)?;
        accounts::transfer(state, &tx.sender, &transfer.to, amount)?;
        Ok(vec![Event::new(
            "transfer",
            [
                ("from", hex::encode(&tx.sender)),
                ("to", hex::encode(&transfer.to)),
                ("amount", amount.to_string()),
            ],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_plain_non_negative_integers() {
        assert_eq!(parse_amount("0").unwrap(), 0);
        assert_eq!(parse_amount(" 1500 ").unwrap(), 1500);
        for bad in ["-1", "", "1e3", "+5", "12a", "0x10"] {
            assert!(
                matches!(parse_amount(bad), Err(TransactionError::InvalidAmount(_))),
                "{bad} should be rejected"
            );
        }
        let too_big = format!("{}0", u128::MAX);
        assert!(matches!(
            parse_amount(&too_big),
            Err(TransactionError::InvalidAmount(_))
        ));
    }
}
