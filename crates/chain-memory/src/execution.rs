//! Token and aggregator execution against a balance table.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use batchpay_chain::abi::{IMulticall3, ITip20};
use std::collections::{HashMap, HashSet};

/// Balances and deployed code. Cloned to execute speculatively.
#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    pub token: Address,
    pub decimals: u8,
    pub aggregator: Option<Address>,
    pub balances: HashMap<Address, U256>,
    pub code: HashMap<Address, Bytes>,
}

impl Ledger {
    pub fn new(token: Address, decimals: u8) -> Self {
        Self {
            token,
            decimals,
            aggregator: None,
            balances: HashMap::new(),
            code: HashMap::new(),
        }
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    /// Recipients a transaction would pay, including nested aggregator calls.
    pub fn payees(&self, to: Address, data: &[u8]) -> Vec<Address> {
        if to == self.token {
            return match ITip20::transferCall::abi_decode(data) {
                Ok(call) => vec![call.to],
                Err(_) => Vec::new(),
            };
        }
        if Some(to) == self.aggregator {
            if let Ok(batch) = IMulticall3::aggregate3Call::abi_decode(data) {
                return batch
                    .calls
                    .iter()
                    .flat_map(|call| self.payees(call.target, &call.callData))
                    .collect();
            }
        }
        Vec::new()
    }

    fn transfer(
        &mut self,
        reverting: &HashSet<Address>,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), String> {
        if reverting.contains(&to) {
            return Err(format!("transfer to {} reverted", to));
        }
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| format!("insufficient balance: {} < {}", available, amount))?;
        self.balances.insert(from, remaining);
        let credited = self.balance_of(to).saturating_add(amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

/// Execute `data` sent to `to` by `from`, mutating `ledger`.
///
/// On error the ledger may be partially modified; callers execute against a
/// clone and only commit on success.
pub(crate) fn execute(
    ledger: &mut Ledger,
    reverting: &HashSet<Address>,
    from: Address,
    to: Address,
    data: &[u8],
) -> Result<(), String> {
    if to == ledger.token {
        let call =
            ITip20::ITip20Calls::abi_decode(data).map_err(|e| format!("invalid calldata: {}", e))?;
        return match call {
            ITip20::ITip20Calls::transfer(call) => ledger.transfer(reverting, from, call.to, call.amount),
            _ => Ok(()),
        };
    }

    if Some(to) == ledger.aggregator {
        let batch = IMulticall3::aggregate3Call::abi_decode(data)
            .map_err(|e| format!("invalid aggregate3 calldata: {}", e))?;

        for (index, call) in batch.calls.iter().enumerate() {
            let mut scratch = ledger.clone();
            match execute(&mut scratch, reverting, from, call.target, &call.callData) {
                Ok(()) => *ledger = scratch,
                Err(reason) if call.allowFailure => {
                    tracing::trace!(index, %reason, "Tolerated sub-call failure");
                }
                Err(reason) => return Err(format!("Multicall3: call {} failed: {}", index, reason)),
            }
        }
        return Ok(());
    }

    Err(format!("no contract at {}", to))
}
