//! JSON-RPC chain backend.
//!
//! [`RpcChain`] implements [`batchpay_chain::ChainClient`] on an alloy
//! provider over HTTP. Wallet methods (`wallet_switchEthereumChain`,
//! `eth_accounts`, `eth_sendTransaction`) are expected to be served by a
//! node or signer proxy holding the account.

mod client;
mod config;
mod convert;

pub use client::RpcChain;
pub use config::{RpcConfig, DEFAULT_RPC_URL};
