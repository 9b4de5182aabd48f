//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use batchpay_chain::{ChainConfig, ReceiptPolicy, DEFAULT_TOKEN, MULTICALL3_ADDRESS};
use batchpay_chain_memory::MemoryChain;
use batchpay_engine::{BatchEngine, BatchEvent, EngineConfig};
use batchpay_types::{RecipientEntry, RecipientId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DECIMALS: u8 = 6;

/// One whole token in base units.
pub const UNIT: u64 = 1_000_000;

pub fn sender() -> Address {
    Address::repeat_byte(0x5e)
}

pub fn recipient(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// Checksummed string form, as a user would paste it.
pub fn recipient_str(n: u8) -> String {
    recipient(n).to_string()
}

pub struct Harness {
    pub chain: Arc<MemoryChain>,
    pub engine: BatchEngine<MemoryChain>,
    pub events: mpsc::UnboundedReceiver<BatchEvent>,
}

impl Harness {
    /// Sender funded with `balance` whole tokens.
    pub fn new(balance: u64, aggregator: bool) -> Self {
        Self::with_receipts(balance, aggregator, fast_receipts())
    }

    pub fn with_receipts(balance: u64, aggregator: bool, receipts: ReceiptPolicy) -> Self {
        let chain = Arc::new(MemoryChain::new(sender(), DEFAULT_TOKEN, DECIMALS));
        chain.set_balance(sender(), U256::from(balance * UNIT));
        if aggregator {
            chain.deploy_aggregator(MULTICALL3_ADDRESS);
        }

        let (tx, events) = mpsc::unbounded_channel();
        let config = EngineConfig {
            chain: ChainConfig::default(),
            receipts,
        };
        let engine = BatchEngine::new(Arc::clone(&chain), config).with_events(tx);

        Self {
            chain,
            engine,
            events,
        }
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.chain.balance_of(address)
    }

    /// Every event emitted so far.
    pub fn drain_events(&mut self) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn fast_receipts() -> ReceiptPolicy {
    ReceiptPolicy {
        poll_interval: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

/// Rows with ids 1.. in the given order.
pub fn rows(entries: &[(&str, &str)]) -> Vec<RecipientEntry> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (address, amount))| RecipientEntry::new(RecipientId(i as u64 + 1), *address, *amount))
        .collect()
}

pub fn units(whole: u64) -> U256 {
    U256::from(whole * UNIT)
}
