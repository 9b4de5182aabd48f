//! Error types for batch payments.

use alloy_primitives::TxHash;
use batchpay_chain::ChainError;

/// Why a batch was refused before reaching Pending.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Add at least one recipient with an address and an amount")]
    MissingRecipients,

    #[error("{count} recipient address(es) are invalid")]
    InvalidAddresses { count: usize },

    #[error("{count} amount(s) are not positive numbers")]
    InvalidAmounts { count: usize },

    #[error("{count} amount(s) have more than {decimals} decimal places")]
    ExcessPrecision { count: usize, decimals: u8 },

    #[error("Total amount does not fit in 256 bits")]
    TotalOverflow,

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: String, available: String },
}

/// Errors returned by [`BatchEngine`](crate::BatchEngine) operations.
///
/// Pre-flight variants are returned directly from `submit_batch`. Terminal
/// attempt failures are classified with
/// [`AttemptFailure::failure`](crate::AttemptFailure::failure).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Validation failed: {reason}")]
    ValidationFailed {
        #[from]
        reason: ValidationError,
    },

    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(ChainError),

    #[error("Could not read token metadata: {0}")]
    MetadataReadFailed(ChainError),

    #[error("Could not verify balance: {0}")]
    BalanceReadFailed(ChainError),

    #[error("Another attempt is still in flight")]
    AttemptInFlight,

    #[error("Simulation failed: {reason}")]
    SimulationFailed { reason: String },

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transaction {tx_hash} reverted")]
    OnChainRevert { tx_hash: TxHash },

    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),

    #[error("Settlement task ended without a verdict: {0}")]
    SettlementInterrupted(String),

    #[error("{failure_count} of {} transfers failed", .success_count + .failure_count)]
    PartialFailure {
        success_count: usize,
        failure_count: usize,
    },
}
