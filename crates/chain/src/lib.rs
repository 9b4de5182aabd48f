//! Chain access for batch payments.
//!
//! This crate contains the transport-independent chain layer:
//!
//! - [`ChainClient`]: the network collaborator (switch chain, accounts,
//!   calls, code lookup, submission, receipts)
//! - [`abi`]: token and aggregator contract interfaces
//! - [`ChainContext`]: pre-flight reads for an attempt (network, decimals,
//!   balance, aggregator availability)
//! - [`wait_for_receipt`]: receipt polling
//!
//! Backends live in `batchpay-chain-rpc` (JSON-RPC over HTTP) and
//! `batchpay-chain-memory` (deterministic, in-process).

pub mod abi;
mod client;
mod config;
mod context;
mod receipt;

pub use client::{ChainClient, ChainError, Receipt, TransactionRequest};
pub use config::{
    short_hash, ChainConfig, ReceiptPolicy, DEFAULT_CHAIN_ID, DEFAULT_EXPLORER_URL, DEFAULT_TOKEN,
    MULTICALL3_ADDRESS,
};
pub use context::{ChainContext, TokenReadError};
pub use receipt::wait_for_receipt;
