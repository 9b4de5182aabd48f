//! Notifications emitted while an attempt progresses.

use alloy_primitives::TxHash;
use batchpay_types::{BatchStatus, ExecutionPath, RecipientId, RecipientResult};

/// Progress notification for observers of a [`BatchEngine`](crate::BatchEngine).
///
/// Delivered through an unbounded channel; a dropped receiver is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A new attempt replaced the previous one.
    AttemptStarted { attempt: u64, rows: usize },

    /// The wallet did not switch networks; the attempt continues.
    /// `attempt` is 0 for single payments.
    NetworkSwitchIgnored { attempt: u64, reason: String },

    StatusChanged { attempt: u64, status: BatchStatus },

    /// The aggregator is unavailable and transfers go out one by one.
    /// Emitted at most once per attempt.
    ModeChanged { attempt: u64, path: ExecutionPath },

    /// A transaction hash exists for these recipients.
    TransactionSubmitted {
        attempt: u64,
        tx_hash: TxHash,
        recipients: Vec<RecipientId>,
    },

    RecipientSettled {
        attempt: u64,
        result: RecipientResult,
    },
}
