//! Mapping between the chain layer's types and alloy's RPC types.

use alloy::network::ReceiptResponse;
use alloy::rpc::types::TransactionRequest as RpcTransactionRequest;
use alloy::transports::TransportError;
use alloy_primitives::U64;
use batchpay_chain::{ChainError, Receipt, TransactionRequest};
use serde::Serialize;

/// EIP-1193 "user rejected request".
pub(crate) const USER_REJECTED: i64 = 4001;

/// Geth-style "execution reverted" error code.
const EXECUTION_REVERTED: i64 = 3;

/// Parameter object of `wallet_switchEthereumChain`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwitchChain {
    chain_id: U64,
}

impl SwitchChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: U64::from(chain_id),
        }
    }
}

pub(crate) fn rpc_request(request: &TransactionRequest) -> RpcTransactionRequest {
    let rpc = RpcTransactionRequest::default()
        .to(request.to)
        .input(request.data.clone().into())
        .value(request.value);
    match request.from {
        Some(from) => rpc.from(from),
        None => rpc,
    }
}

pub(crate) fn receipt<R: ReceiptResponse>(receipt: &R) -> Receipt {
    Receipt {
        tx_hash: receipt.transaction_hash(),
        success: receipt.status(),
        block_number: receipt.block_number(),
    }
}

/// Classify a transport failure.
///
/// Error responses are split into wallet rejections, reverts and other node
/// errors; everything without a response is a transport or decode problem.
pub(crate) fn chain_error(error: TransportError) -> ChainError {
    match error.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED => {
            ChainError::Rejected(payload.message.to_string())
        }
        Some(payload)
            if payload.code == EXECUTION_REVERTED || payload.message.contains("revert") =>
        {
            ChainError::Reverted(payload.message.to_string())
        }
        Some(payload) => ChainError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
        },
        None if error.is_transport_error() => ChainError::Transport(error.to_string()),
        None => ChainError::Decode(error.to_string()),
    }
}
