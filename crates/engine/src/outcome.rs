//! Reducing per-recipient results to an attempt verdict.

use crate::error::BatchError;
use alloy_primitives::TxHash;
use batchpay_types::{
    BatchAttempt, BatchStatus, ExecutionPath, FailureReason, RecipientOutcome, RecipientResult,
};

/// Terminal status of an attempt from its results.
///
/// - Atomic: Confirmed iff the single transaction succeeded. Results are
///   uniform, so this is the same as "every row succeeded".
/// - Fallback: Confirmed iff no row failed, regardless of how many succeeded.
///
/// An attempt with no results never confirms.
pub fn aggregate(path: ExecutionPath, results: &[RecipientResult]) -> BatchStatus {
    let confirmed = match path {
        ExecutionPath::Atomic => results.first().is_some_and(|r| r.outcome.is_success()),
        ExecutionPath::Fallback => {
            !results.is_empty() && results.iter().all(|r| r.outcome.is_success())
        }
    };
    if confirmed {
        BatchStatus::Confirmed
    } else {
        BatchStatus::Failed
    }
}

/// The hash reported as "the" transaction of an attempt.
///
/// Atomic attempts report the aggregator transaction whatever its verdict.
/// Fallback attempts report the first transfer in plan order, but only when
/// the whole batch confirmed.
pub fn primary_tx_hash(
    path: ExecutionPath,
    aggregate_tx_hash: Option<TxHash>,
    status: BatchStatus,
    results: &[RecipientResult],
) -> Option<TxHash> {
    match path {
        ExecutionPath::Atomic => aggregate_tx_hash,
        ExecutionPath::Fallback if status == BatchStatus::Confirmed => results
            .iter()
            .min_by_key(|r| r.position)
            .and_then(|r| r.outcome.tx_hash()),
        ExecutionPath::Fallback => None,
    }
}

/// Classification of a failed attempt.
pub trait AttemptFailure {
    /// The error describing why the attempt failed, or `None` unless Failed.
    fn failure(&self) -> Option<BatchError>;
}

impl AttemptFailure for BatchAttempt {
    fn failure(&self) -> Option<BatchError> {
        if self.status != BatchStatus::Failed {
            return None;
        }

        match self.path? {
            ExecutionPath::Atomic => {
                let outcome = &self.results.first()?.outcome;
                let RecipientOutcome::Failure { reason, tx_hash } = outcome else {
                    return None;
                };
                Some(match reason {
                    FailureReason::BatchReverted | FailureReason::Reverted => {
                        BatchError::OnChainRevert {
                            tx_hash: (*tx_hash).or(self.primary_tx_hash)?,
                        }
                    }
                    FailureReason::SubmissionRejected(reason) => {
                        BatchError::SubmissionRejected(reason.clone())
                    }
                    FailureReason::ConfirmationFailed(reason) => {
                        BatchError::ConfirmationFailed(reason.clone())
                    }
                })
            }
            ExecutionPath::Fallback => {
                let counts = self.counts();
                Some(BatchError::PartialFailure {
                    success_count: counts.success_count,
                    failure_count: counts.failure_count,
                })
            }
        }
    }
}
