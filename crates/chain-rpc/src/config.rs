use std::time::Duration;

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://rpc.moderato.tempo.xyz";

/// Endpoint settings for [`crate::RpcChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub url: String,
    /// Per-request timeout, covering connect, send and body read.
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
