//! Chain and receipt configuration.

use alloy_primitives::{address, Address, TxHash};
use std::time::Duration;

/// Chain id of the default network.
pub const DEFAULT_CHAIN_ID: u64 = 42431;

/// Default payment token.
pub const DEFAULT_TOKEN: Address = address!("0x20c0000000000000000000000000000000000000");

/// Well-known Multicall3 deployment address (identical on every chain).
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Default block explorer base URL.
pub const DEFAULT_EXPLORER_URL: &str = "https://explore.tempo.xyz";

/// Network, token and aggregator the engine targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub token: Address,
    pub aggregator: Address,
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            token: DEFAULT_TOKEN,
            aggregator: MULTICALL3_ADDRESS,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }
}

impl ChainConfig {
    /// Explorer page of a transaction.
    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }
}

/// Polling policy for inclusion receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Abbreviated hash for display: `0x12345678...abcdef`.
pub fn short_hash(hash: &TxHash) -> String {
    let full = hash.to_string();
    format!("{}...{}", &full[..10], &full[full.len() - 6..])
}
