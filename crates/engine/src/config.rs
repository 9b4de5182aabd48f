//! Engine configuration.

use batchpay_chain::{ChainConfig, ReceiptPolicy};

/// Everything a [`BatchEngine`](crate::BatchEngine) needs besides its client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Network, token, aggregator and explorer.
    pub chain: ChainConfig,
    /// How long and how often to poll for receipts.
    pub receipts: ReceiptPolicy,
}
