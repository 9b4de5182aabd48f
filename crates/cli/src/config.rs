//! TOML configuration file.
//!
//! ```toml
//! [chain]
//! chain_id = 42431
//! token = "0x20c0000000000000000000000000000000000000"
//! aggregator = "0xcA11bde05977b3631167028862bE2a173976CA11"
//! explorer_url = "https://explore.tempo.xyz"
//!
//! [rpc]
//! url = "https://rpc.moderato.tempo.xyz"
//! request_timeout_ms = 30000
//!
//! [receipts]
//! poll_interval_ms = 1000
//! timeout_ms = 120000
//! ```
//!
//! Every section and field is optional.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use batchpay_chain::{
    ChainConfig, ReceiptPolicy, DEFAULT_CHAIN_ID, DEFAULT_EXPLORER_URL, DEFAULT_TOKEN,
    MULTICALL3_ADDRESS,
};
use batchpay_chain_rpc::{RpcConfig, DEFAULT_RPC_URL};
use batchpay_engine::EngineConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub chain: ChainSection,

    #[serde(default)]
    pub rpc: RpcSection,

    #[serde(default)]
    pub receipts: ReceiptsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSection {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default = "default_token")]
    pub token: Address,

    /// Multicall3-compatible aggregator.
    #[serde(default = "default_aggregator")]
    pub aggregator: Address,

    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            token: default_token(),
            aggregator: default_aggregator(),
            explorer_url: default_explorer_url(),
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_token() -> Address {
    DEFAULT_TOKEN
}

fn default_aggregator() -> Address {
    MULTICALL3_ADDRESS
}

fn default_explorer_url() -> String {
    DEFAULT_EXPLORER_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcSection {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiptsSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_receipt_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ReceiptsSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_receipt_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_receipt_timeout_ms() -> u64 {
    120_000
}

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, rpc_url: Option<&str>) {
        if let Some(url) = rpc_url {
            self.rpc.url = url.to_string();
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chain: ChainConfig {
                chain_id: self.chain.chain_id,
                token: self.chain.token,
                aggregator: self.chain.aggregator,
                explorer_url: self.chain.explorer_url.clone(),
            },
            receipts: ReceiptPolicy {
                poll_interval: Duration::from_millis(self.receipts.poll_interval_ms),
                timeout: Duration::from_millis(self.receipts.timeout_ms),
            },
        }
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            url: self.rpc.url.clone(),
            request_timeout: Duration::from_millis(self.rpc.request_timeout_ms),
        }
    }
}
