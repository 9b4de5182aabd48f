//! Chain client trait.
//!
//! Defines the `ChainClient` interface implemented by both the JSON-RPC
//! backend (`chain-rpc`) and the deterministic in-memory backend
//! (`chain-memory`).

use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;

/// Error returned when a chain request fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Rejected by wallet: {0}")]
    Rejected(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("No connected account")]
    NoAccount,

    #[error("Receipt for {hash} not available after {waited:?}")]
    ReceiptTimeout { hash: TxHash, waited: Duration },
}

/// A contract call or transaction.
///
/// Used both for read-only calls (`eth_call`) and for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TransactionRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to,
            data,
            value: U256::ZERO,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// Inclusion receipt of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Network interface for reading state and submitting transactions.
///
/// Every method is a single round-trip; retry and polling policies live
/// outside this trait (see [`wait_for_receipt`](crate::wait_for_receipt)).
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Ask the connected wallet to make `chain_id` the active network.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError>;

    /// Accounts exposed by the connected wallet, primary account first.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, request: &TransactionRequest) -> Result<Bytes, ChainError>;

    /// Deployed bytecode at `address` (empty if none).
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Sign (via the wallet) and submit a transaction.
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError>;

    /// Receipt of `hash`, or `None` if not yet included.
    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError>;
}
