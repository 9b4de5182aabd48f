//! Single-recipient payment with a pre-submission dry run.

use crate::engine::{BatchEngine, InFlightGuard};
use crate::error::{BatchError, ValidationError};
use alloy_primitives::{Address, TxHash, U256};
use batchpay_chain::{
    abi, ChainClient, ChainConfig, ChainContext, ReceiptPolicy, TokenReadError, TransactionRequest,
};
use batchpay_types::{check_human, parse_address, to_base_units, to_human, AmountError};
use tracing::{info, warn, Instrument, Span};

/// Proof of a confirmed single payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub tx_hash: TxHash,
    /// Amount paid, in token base units.
    pub amount: U256,
    pub explorer_url: String,
}

impl<C: ChainClient + 'static> BatchEngine<C> {
    /// Pay `amount` (human decimal) to `recipient` in one transfer.
    ///
    /// Unlike a batch, the transfer is simulated with `eth_call` first and
    /// nothing is sent if the simulation reverts. Does not touch the current
    /// batch attempt, but shares its in-flight lock. As with batches, the
    /// send and the wait for its receipt outlive a dropped caller.
    pub async fn pay(&self, recipient: &str, amount: &str) -> Result<PaymentReceipt, BatchError> {
        let guard = self.begin()?;

        let to = parse_address(recipient).map_err(|_| ValidationError::InvalidAddresses { count: 1 })?;
        let human = check_human(amount).map_err(|_| ValidationError::InvalidAmounts { count: 1 })?;

        let ctx = self.context();
        let sender = ctx.sender().await.map_err(BatchError::WalletUnavailable)?;
        self.ensure_network(0).await;

        let token = ctx.load_token(sender).await.map_err(|e| match e {
            TokenReadError::Decimals(e) => BatchError::MetadataReadFailed(e),
            TokenReadError::Balance(e) => BatchError::BalanceReadFailed(e),
        })?;

        let value = to_base_units(human, token.decimals).map_err(|e| match e {
            AmountError::ExcessPrecision { decimals } => {
                ValidationError::ExcessPrecision { count: 1, decimals }
            }
            _ => ValidationError::InvalidAmounts { count: 1 },
        })?;
        if value > token.sender_balance {
            return Err(ValidationError::InsufficientBalance {
                required: to_human(value, token.decimals),
                available: to_human(token.sender_balance, token.decimals),
            }
            .into());
        }

        let request =
            TransactionRequest::new(token.token, abi::encode_transfer(to, value)).from(sender);

        let simulated = ctx
            .simulate(&request)
            .await
            .map_err(|e| BatchError::SimulationFailed {
                reason: e.to_string(),
            })?;
        let accepted = abi::decode_transfer_ok(&simulated).map_err(|e| {
            BatchError::SimulationFailed {
                reason: e.to_string(),
            }
        })?;
        if !accepted {
            return Err(BatchError::SimulationFailed {
                reason: "transfer returned false".into(),
            });
        }

        let payment = Payment {
            ctx: ctx.clone(),
            receipts: self.config().receipts,
            chain: self.config().chain.clone(),
            request,
            recipient: to,
            amount: value,
        };
        tokio::spawn(payment.settle(guard).instrument(Span::current()))
            .await
            .map_err(|e| BatchError::SettlementInterrupted(e.to_string()))?
    }
}

/// A simulated payment that is ready to be sent.
struct Payment<C> {
    ctx: ChainContext<C>,
    receipts: ReceiptPolicy,
    chain: ChainConfig,
    request: TransactionRequest,
    recipient: Address,
    amount: U256,
}

impl<C: ChainClient + 'static> Payment<C> {
    async fn settle(self, _guard: InFlightGuard) -> Result<PaymentReceipt, BatchError> {
        let tx_hash = self
            .ctx
            .submit(&self.request)
            .await
            .map_err(|e| BatchError::SubmissionRejected(e.to_string()))?;
        info!(%tx_hash, recipient = %self.recipient, amount = %self.amount, "Payment submitted");

        let receipt = self
            .ctx
            .wait_for_receipt(tx_hash, &self.receipts)
            .await
            .map_err(|e| BatchError::ConfirmationFailed(e.to_string()))?;
        if !receipt.success {
            warn!(%tx_hash, "Payment reverted");
            return Err(BatchError::OnChainRevert { tx_hash });
        }

        Ok(PaymentReceipt {
            tx_hash,
            amount: self.amount,
            explorer_url: self.chain.explorer_tx_url(&tx_hash),
        })
    }
}
