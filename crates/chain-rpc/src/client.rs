//! HTTP JSON-RPC client.

use crate::config::RpcConfig;
use crate::convert::{chain_error, receipt, rpc_request, SwitchChain};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::Http;
use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use batchpay_chain::{ChainClient, ChainError, Receipt, TransactionRequest};
use serde_json::Value;
use tracing::{debug, trace};

/// [`ChainClient`] speaking JSON-RPC over HTTP through an alloy provider.
///
/// No fillers are installed: nonce, gas and signing are left to the wallet
/// or signer proxy behind the endpoint.
pub struct RpcChain {
    provider: DynProvider,
    url: String,
}

impl RpcChain {
    pub fn new(config: &RpcConfig) -> Result<Self, ChainError> {
        let url: reqwest::Url = config
            .url
            .parse()
            .map_err(|e| ChainError::Transport(format!("invalid RPC URL {}: {}", config.url, e)))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let transport = Http::with_client(http, url);
        let is_local = transport.guess_local();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_client(RpcClient::new(transport, is_local))
            .erased();

        Ok(Self {
            provider,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError> {
        trace!(chain_id, "wallet_switchEthereumChain");
        self.provider
            .raw_request::<_, Value>(
                "wallet_switchEthereumChain".into(),
                (SwitchChain::new(chain_id),),
            )
            .await
            .map(|_| ())
            .map_err(chain_error)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.provider.get_accounts().await.map_err(chain_error)
    }

    async fn call(&self, request: &TransactionRequest) -> Result<Bytes, ChainError> {
        trace!(to = %request.to, "eth_call");
        self.provider
            .call(rpc_request(request))
            .await
            .map_err(chain_error)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider.get_code_at(address).await.map_err(chain_error)
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash, ChainError> {
        let pending = self
            .provider
            .send_transaction(rpc_request(request))
            .await
            .map_err(chain_error)?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, to = %request.to, "Transaction accepted by node");
        Ok(tx_hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        let found = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(chain_error)?;
        Ok(found.as_ref().map(receipt))
    }
}
