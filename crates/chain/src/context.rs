//! Pre-flight chain reads for a payment attempt.
//!
//! [`ChainContext`] is passed explicitly to the engine instead of being a
//! process-wide singleton, so tests can swap in a deterministic client.

use crate::abi;
use crate::client::{ChainClient, ChainError, Receipt, TransactionRequest};
use crate::config::{ChainConfig, ReceiptPolicy};
use crate::receipt::wait_for_receipt;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use batchpay_types::TokenContext;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which token read failed while loading a [`TokenContext`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenReadError {
    #[error("Could not read token metadata: {0}")]
    Decimals(ChainError),

    #[error("Could not verify balance: {0}")]
    Balance(ChainError),
}

/// The active network, token and aggregator as seen by one client.
pub struct ChainContext<C> {
    client: Arc<C>,
    config: ChainConfig,
}

impl<C> Clone for ChainContext<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: ChainClient> ChainContext<C> {
    pub fn new(client: Arc<C>, config: ChainConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Request the wallet switch to the configured chain.
    ///
    /// Callers treat failure as non-fatal: the wallet may already be on the
    /// right network.
    pub async fn ensure_network(&self) -> Result<(), ChainError> {
        self.client.switch_chain(self.config.chain_id).await
    }

    /// The connected account that pays for the batch.
    pub async fn sender(&self) -> Result<Address, ChainError> {
        self.client
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(ChainError::NoAccount)
    }

    /// Read the token's decimal count.
    pub async fn read_decimals(&self) -> Result<u8, ChainError> {
        let request = TransactionRequest::new(self.config.token, abi::encode_decimals());
        let data = self.client.call(&request).await?;
        abi::decode_decimals(&data)
    }

    /// Read `owner`'s token balance in base units.
    pub async fn read_balance(&self, owner: Address) -> Result<U256, ChainError> {
        let request = TransactionRequest::new(self.config.token, abi::encode_balance_of(owner));
        let data = self.client.call(&request).await?;
        abi::decode_balance(&data)
    }

    /// Read decimals, then the sender's balance.
    ///
    /// The balance is never read if decimals cannot be resolved.
    pub async fn load_token(&self, owner: Address) -> Result<TokenContext, TokenReadError> {
        let decimals = self.read_decimals().await.map_err(TokenReadError::Decimals)?;
        let sender_balance = self
            .read_balance(owner)
            .await
            .map_err(TokenReadError::Balance)?;

        Ok(TokenContext {
            token: self.config.token,
            decimals,
            sender_balance,
        })
    }

    /// Check whether the aggregator contract is deployed.
    ///
    /// Empty code is a negative answer, not an error. A failed lookup is
    /// also reported as unavailable so the batch can still proceed one
    /// transfer at a time.
    pub async fn probe_aggregator(&self) -> bool {
        match self.client.code_at(self.config.aggregator).await {
            Ok(code) => {
                let available = !code.is_empty();
                debug!(
                    aggregator = %self.config.aggregator,
                    code_len = code.len(),
                    available,
                    "Probed aggregator"
                );
                available
            }
            Err(e) => {
                warn!(
                    aggregator = %self.config.aggregator,
                    error = %e,
                    "Aggregator probe failed, treating as unavailable"
                );
                false
            }
        }
    }

    /// Dry-run a transaction against the latest state.
    pub async fn simulate(&self, request: &TransactionRequest) -> Result<Bytes, ChainError> {
        self.client.call(request).await
    }

    pub async fn submit(&self, request: &TransactionRequest) -> Result<TxHash, ChainError> {
        self.client.send_transaction(request).await
    }

    pub async fn wait_for_receipt(
        &self,
        hash: TxHash,
        policy: &ReceiptPolicy,
    ) -> Result<Receipt, ChainError> {
        wait_for_receipt(self.client.as_ref(), hash, policy).await
    }
}
