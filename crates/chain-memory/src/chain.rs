//! In-memory chain with one token and an optional aggregator.

use crate::execution::{execute, Ledger};
use alloy_primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy_sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use batchpay_chain::abi::ITip20;
use batchpay_chain::{ChainClient, ChainError, Receipt, TransactionRequest};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Placeholder bytecode installed at deployed contract addresses.
const CONTRACT_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

/// One request received by the chain, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    SwitchChain(u64),
    Accounts,
    Call { to: Address, selector: [u8; 4] },
    CodeAt(Address),
    SendTransaction { to: Address },
    Receipt(TxHash),
}

/// Injected failures.
#[derive(Debug, Default)]
struct Faults {
    reject_switch: bool,
    decimals_unavailable: bool,
    balance_unavailable: bool,
    code_unavailable: bool,
    withhold_receipts: bool,
    /// Transfers to these recipients revert on-chain.
    reverting: HashSet<Address>,
    /// Submissions touching these recipients are refused by the wallet.
    rejecting: HashMap<Address, String>,
}

struct PendingReceipt {
    receipt: Receipt,
    polls_remaining: u32,
}

struct ChainState {
    chain_id: u64,
    accounts: Vec<Address>,
    ledger: Ledger,
    faults: Faults,
    confirmation_polls: u32,
    receipts: HashMap<TxHash, PendingReceipt>,
    sent: Vec<(TxHash, TransactionRequest)>,
    nonce: u64,
    block_number: u64,
    log: Vec<ChainCall>,
}

/// Deterministic chain implementing [`ChainClient`].
///
/// Token transfers and aggregator batches are executed against an in-memory
/// balance table. Aggregated sub-calls are executed on behalf of the
/// transaction sender. Every request is recorded so tests can assert on
/// exactly what reached the network.
pub struct MemoryChain {
    state: Mutex<ChainState>,
}

impl MemoryChain {
    /// Create a chain with one connected account and a token with `decimals`.
    pub fn new(account: Address, token: Address, decimals: u8) -> Self {
        Self {
            state: Mutex::new(ChainState {
                chain_id: 1,
                accounts: vec![account],
                ledger: Ledger::new(token, decimals),
                faults: Faults::default(),
                confirmation_polls: 0,
                receipts: HashMap::new(),
                sent: Vec::new(),
                nonce: 0,
                block_number: 0,
                log: Vec::new(),
            }),
        }
    }

    // ── Setup ──

    pub fn set_balance(&self, owner: Address, amount: U256) {
        self.state.lock().ledger.balances.insert(owner, amount);
    }

    /// Install contract code at `address`, making it the aggregator.
    pub fn deploy_aggregator(&self, address: Address) {
        let mut state = self.state.lock();
        state.ledger.aggregator = Some(address);
        state.ledger.code.insert(address, Bytes::from_static(CONTRACT_CODE));
    }

    /// Disconnect the wallet (no accounts exposed).
    pub fn disconnect(&self) {
        self.state.lock().accounts.clear();
    }

    pub fn reject_network_switch(&self) {
        self.state.lock().faults.reject_switch = true;
    }

    pub fn fail_decimals_read(&self) {
        self.state.lock().faults.decimals_unavailable = true;
    }

    pub fn fail_balance_read(&self) {
        self.state.lock().faults.balance_unavailable = true;
    }

    pub fn fail_code_lookup(&self) {
        self.state.lock().faults.code_unavailable = true;
    }

    /// Receipts are never returned (simulates a stuck transaction).
    pub fn withhold_receipts(&self) {
        self.state.lock().faults.withhold_receipts = true;
    }

    /// Make every transfer to `recipient` revert on-chain.
    pub fn revert_transfers_to(&self, recipient: Address) {
        self.state.lock().faults.reverting.insert(recipient);
    }

    /// Make the wallet refuse any submission paying `recipient`.
    pub fn reject_submissions_to(&self, recipient: Address, reason: impl Into<String>) {
        self.state
            .lock()
            .faults
            .rejecting
            .insert(recipient, reason.into());
    }

    /// Number of receipt lookups that return `None` before inclusion.
    pub fn set_confirmation_polls(&self, polls: u32) {
        self.state.lock().confirmation_polls = polls;
    }

    // ── Inspection ──

    pub fn active_chain_id(&self) -> u64 {
        self.state.lock().chain_id
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.state.lock().ledger.balance_of(owner)
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<ChainCall> {
        self.state.lock().log.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().log.len()
    }

    /// Transactions accepted for inclusion, in submission order.
    pub fn sent_transactions(&self) -> Vec<(TxHash, TransactionRequest)> {
        self.state.lock().sent.clone()
    }

    fn record(&self, call: ChainCall) {
        trace!(?call, "Memory chain request");
        self.state.lock().log.push(call);
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError> {
        self.record(ChainCall::SwitchChain(chain_id));
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        if state.faults.reject_switch {
            return Err(ChainError::Rejected("user rejected network switch".into()));
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.record(ChainCall::Accounts);
        tokio::task::yield_now().await;
        Ok(self.state.lock().accounts.clone())
    }

    async fn call(&self, request: &TransactionRequest) -> Result<Bytes, ChainError> {
        let mut selector = [0u8; 4];
        if let Some(prefix) = request.data.get(..4) {
            selector.copy_from_slice(prefix);
        }
        self.record(ChainCall::Call {
            to: request.to,
            selector,
        });
        tokio::task::yield_now().await;

        let state = self.state.lock();
        if request.to != state.ledger.token {
            return Err(ChainError::Reverted("no contract at target".into()));
        }

        let call = ITip20::ITip20Calls::abi_decode(&request.data)
            .map_err(|e| ChainError::Reverted(format!("invalid calldata: {}", e)))?;

        match call {
            ITip20::ITip20Calls::decimals(_) => {
                if state.faults.decimals_unavailable {
                    return Err(ChainError::Transport("decimals() unavailable".into()));
                }
                Ok(U256::from(state.ledger.decimals).abi_encode().into())
            }
            ITip20::ITip20Calls::balanceOf(call) => {
                if state.faults.balance_unavailable {
                    return Err(ChainError::Transport("balanceOf() unavailable".into()));
                }
                Ok(state.ledger.balance_of(call.owner).abi_encode().into())
            }
            ITip20::ITip20Calls::transfer(_) => {
                let from = request
                    .from
                    .or_else(|| state.accounts.first().copied())
                    .ok_or(ChainError::NoAccount)?;
                let mut scratch = state.ledger.clone();
                execute(&mut scratch, &state.faults.reverting, from, request.to, &request.data)
                    .map_err(ChainError::Reverted)?;
                Ok(true.abi_encode().into())
            }
        }
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.record(ChainCall::CodeAt(address));
        tokio::task::yield_now().await;

        let state = self.state.lock();
        if state.faults.code_unavailable {
            return Err(ChainError::Transport("eth_getCode unavailable".into()));
        }
        Ok(state.ledger.code.get(&address).cloned().unwrap_or_default())
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError> {
        self.record(ChainCall::SendTransaction { to: request.to });
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        let from = request
            .from
            .or_else(|| state.accounts.first().copied())
            .ok_or(ChainError::NoAccount)?;

        let payees = state.ledger.payees(request.to, &request.data);
        if let Some(reason) = payees
            .iter()
            .find_map(|payee| state.faults.rejecting.get(payee))
        {
            return Err(ChainError::Rejected(reason.clone()));
        }

        let mut scratch = state.ledger.clone();
        let success = execute(&mut scratch, &state.faults.reverting, from, request.to, &request.data)
            .map_err(|reason| trace!(%reason, "Transaction reverted"))
            .is_ok();
        if success {
            state.ledger = scratch;
        }

        state.nonce += 1;
        state.block_number += 1;
        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        let hash = keccak256(&preimage);

        let receipt = Receipt {
            tx_hash: hash,
            success,
            block_number: Some(state.block_number),
        };
        let polls_remaining = state.confirmation_polls;
        state.receipts.insert(
            hash,
            PendingReceipt {
                receipt,
                polls_remaining,
            },
        );
        state.sent.push((hash, request.clone()));

        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        self.record(ChainCall::Receipt(hash));
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        if state.faults.withhold_receipts {
            return Ok(None);
        }
        let Some(pending) = state.receipts.get_mut(&hash) else {
            return Ok(None);
        };
        if pending.polls_remaining > 0 {
            pending.polls_remaining -= 1;
            return Ok(None);
        }
        Ok(Some(pending.receipt.clone()))
    }
}
