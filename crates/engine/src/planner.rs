//! Turning validated rows into an executable plan.
//!
//! A plan is either one aggregator call carrying every transfer (atomic) or
//! a list of independent transfers (fallback). Both keep the order of the
//! validated rows.

use crate::error::ValidationError;
use crate::validation::ValidRow;
use alloy_primitives::{Address, Bytes, U256};
use batchpay_chain::abi::{self, IMulticall3};
use batchpay_types::{
    sum_base_units, to_base_units, to_human, AmountError, ExecutionPath, RecipientId, TokenContext,
};

/// One token transfer with its amount scaled to base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub id: RecipientId,
    pub position: usize,
    pub recipient: Address,
    pub amount: U256,
}

/// One entry of an aggregator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlanEntry {
    pub target: Address,
    pub allow_failure: bool,
    pub call_data: Bytes,
}

/// Ordered aggregator sub-calls, one token `transfer` per recipient.
///
/// Every entry has `allow_failure = false`: the aggregator reverts the whole
/// invocation if any transfer fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlan {
    entries: Vec<CallPlanEntry>,
    transfers: Vec<PlannedTransfer>,
}

impl CallPlan {
    pub fn new(token: Address, transfers: Vec<PlannedTransfer>) -> Self {
        let entries = transfers
            .iter()
            .map(|transfer| CallPlanEntry {
                target: token,
                allow_failure: false,
                call_data: abi::encode_transfer(transfer.recipient, transfer.amount),
            })
            .collect();
        Self { entries, transfers }
    }

    pub fn entries(&self) -> &[CallPlanEntry] {
        &self.entries
    }

    pub fn transfers(&self) -> &[PlannedTransfer] {
        &self.transfers
    }

    /// `aggregate3` calldata executing the entries in order.
    pub fn calldata(&self) -> Bytes {
        let calls = self
            .entries
            .iter()
            .map(|entry| IMulticall3::Call3 {
                target: entry.target,
                allowFailure: entry.allow_failure,
                callData: entry.call_data.clone(),
            })
            .collect();
        abi::encode_aggregate3(calls)
    }
}

/// Transaction shape of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPlan {
    Atomic(CallPlan),
    Fallback(Vec<PlannedTransfer>),
}

impl BatchPlan {
    /// Pick the shape for `transfers` given aggregator availability.
    pub fn build(token: Address, transfers: Vec<PlannedTransfer>, aggregator_available: bool) -> Self {
        if aggregator_available {
            BatchPlan::Atomic(CallPlan::new(token, transfers))
        } else {
            BatchPlan::Fallback(transfers)
        }
    }

    pub fn path(&self) -> ExecutionPath {
        match self {
            BatchPlan::Atomic(_) => ExecutionPath::Atomic,
            BatchPlan::Fallback(_) => ExecutionPath::Fallback,
        }
    }

    pub fn transfers(&self) -> &[PlannedTransfer] {
        match self {
            BatchPlan::Atomic(plan) => plan.transfers(),
            BatchPlan::Fallback(transfers) => transfers,
        }
    }
}

/// Scale every row to base units and check the total against the balance.
///
/// Precision is checked before the balance: a row that cannot be represented
/// at the token's decimals has no well-defined total.
pub fn plan_transfers(
    rows: &[ValidRow],
    token: &TokenContext,
) -> Result<Vec<PlannedTransfer>, ValidationError> {
    let mut transfers = Vec::with_capacity(rows.len());
    let mut excess_precision = 0;
    let mut invalid = 0;

    for row in rows {
        match to_base_units(&row.amount, token.decimals) {
            Ok(amount) => transfers.push(PlannedTransfer {
                id: row.id,
                position: row.position,
                recipient: row.address,
                amount,
            }),
            Err(AmountError::ExcessPrecision { .. }) => excess_precision += 1,
            Err(_) => invalid += 1,
        }
    }

    if excess_precision > 0 {
        return Err(ValidationError::ExcessPrecision {
            count: excess_precision,
            decimals: token.decimals,
        });
    }
    if invalid > 0 {
        return Err(ValidationError::InvalidAmounts { count: invalid });
    }

    let total = sum_base_units(transfers.iter().map(|t| t.amount))
        .map_err(|_| ValidationError::TotalOverflow)?;
    if total > token.sender_balance {
        return Err(ValidationError::InsufficientBalance {
            required: to_human(total, token.decimals),
            available: to_human(token.sender_balance, token.decimals),
        });
    }

    Ok(transfers)
}
