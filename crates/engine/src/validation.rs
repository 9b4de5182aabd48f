//! Offline submission gate.
//!
//! Runs before any network request. Rows with an empty address or amount are
//! skipped; every other row must carry a well-formed address and a positive
//! decimal amount. Whitespace is not empty.

use crate::error::ValidationError;
use alloy_primitives::Address;
use batchpay_types::{check_human, is_valid_address, parse_address, RecipientEntry, RecipientId};

/// A row that passed the offline checks, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRow {
    pub id: RecipientId,
    /// Index among the valid rows (on-chain order for the atomic path).
    pub position: usize,
    pub address: Address,
    /// Trimmed human amount, not yet scaled to the token's decimals.
    pub amount: String,
}

/// Check every row and keep the submittable ones.
///
/// Gates, in order:
/// 1. any non-empty address that is malformed ([`ValidationError::InvalidAddresses`])
/// 2. any complete row whose amount is not a positive number
///    ([`ValidationError::InvalidAmounts`])
/// 3. no complete row left ([`ValidationError::MissingRecipients`])
pub fn check_rows(rows: &[RecipientEntry]) -> Result<Vec<ValidRow>, ValidationError> {
    let invalid_addresses = rows
        .iter()
        .filter(|row| !row.address.is_empty() && !is_valid_address(&row.address))
        .count();
    if invalid_addresses > 0 {
        return Err(ValidationError::InvalidAddresses {
            count: invalid_addresses,
        });
    }

    let complete: Vec<&RecipientEntry> = rows.iter().filter(|row| row.is_complete()).collect();

    let invalid_amounts = complete
        .iter()
        .filter(|row| check_human(&row.amount).is_err())
        .count();
    if invalid_amounts > 0 {
        return Err(ValidationError::InvalidAmounts {
            count: invalid_amounts,
        });
    }

    if complete.is_empty() {
        return Err(ValidationError::MissingRecipients);
    }

    let mut valid = Vec::with_capacity(complete.len());
    for (position, row) in complete.into_iter().enumerate() {
        let address = parse_address(&row.address)
            .map_err(|_| ValidationError::InvalidAddresses { count: 1 })?;
        valid.push(ValidRow {
            id: row.id,
            position,
            address,
            amount: row.amount.trim().to_string(),
        });
    }

    Ok(valid)
}
