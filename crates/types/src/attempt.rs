//! Batch attempt lifecycle and per-recipient outcomes.
//!
//! ```text
//! Idle ──(validation + balance ok)──▶ Pending ──▶ Confirmed
//!                                         └─────▶ Failed
//! ```
//!
//! A [`BatchAttempt`] is created per submission and is immutable once it
//! reaches a terminal status.

use crate::recipient::RecipientId;
use alloy_primitives::{Address, TxHash, U256};
use std::fmt;

/// How the transfers of an attempt reach the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// All transfers bundled into one aggregator transaction.
    Atomic,
    /// One independent transaction per recipient.
    Fallback,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPath::Atomic => write!(f, "atomic"),
            ExecutionPath::Fallback => write!(f, "fallback"),
        }
    }
}

/// Status of a batch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchStatus {
    #[default]
    Idle,
    Pending,
    Confirmed,
    Failed,
}

impl BatchStatus {
    /// Check if the status is terminal (no further transitions).
    pub fn is_final(&self) -> bool {
        matches!(self, BatchStatus::Confirmed | BatchStatus::Failed)
    }

    /// Check whether `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Idle, BatchStatus::Pending)
                | (BatchStatus::Pending, BatchStatus::Confirmed)
                | (BatchStatus::Pending, BatchStatus::Failed)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Idle => write!(f, "idle"),
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::Confirmed => write!(f, "confirmed"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a recipient's transfer did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The atomic batch transaction reverted; every transfer was unwound.
    BatchReverted,
    /// The recipient's own transaction reverted.
    Reverted,
    /// The wallet or node refused the transaction before a hash existed.
    SubmissionRejected(String),
    /// A hash exists but its receipt could not be obtained.
    ConfirmationFailed(String),
}

impl FailureReason {
    /// Whether the failure happened on-chain (gas was spent).
    pub fn is_on_chain(&self) -> bool {
        matches!(self, FailureReason::BatchReverted | FailureReason::Reverted)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BatchReverted => write!(f, "batch reverted"),
            FailureReason::Reverted => write!(f, "reverted"),
            FailureReason::SubmissionRejected(reason) => write!(f, "{}", reason),
            FailureReason::ConfirmationFailed(reason) => {
                write!(f, "confirmation failed: {}", reason)
            }
        }
    }
}

/// Final verdict for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientOutcome {
    Success {
        tx_hash: TxHash,
    },
    Failure {
        reason: FailureReason,
        /// Present when the failure happened after submission.
        tx_hash: Option<TxHash>,
    },
}

impl RecipientOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecipientOutcome::Success { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            RecipientOutcome::Success { tx_hash } => Some(*tx_hash),
            RecipientOutcome::Failure { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            RecipientOutcome::Success { .. } => None,
            RecipientOutcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// A settled recipient together with what was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientResult {
    pub id: RecipientId,
    /// Position in the submitted plan (display order after filtering).
    pub position: usize,
    pub recipient: Address,
    /// Amount in token base units.
    pub amount: U256,
    pub outcome: RecipientOutcome,
}

/// Success and failure tallies of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeCounts {
    pub success_count: usize,
    pub failure_count: usize,
}

/// Token metadata and sender balance, read fresh for every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenContext {
    pub token: Address,
    pub decimals: u8,
    /// Sender balance in base units.
    pub sender_balance: U256,
}

/// One "submit" action and everything it produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchAttempt {
    /// Monotonic attempt number within an engine (0 = no attempt yet).
    pub number: u64,
    pub status: BatchStatus,
    /// Chosen once the attempt leaves Idle.
    pub path: Option<ExecutionPath>,
    /// The aggregator transaction (atomic) or the first transfer of a fully
    /// confirmed fallback batch.
    pub primary_tx_hash: Option<TxHash>,
    /// Token decimals read for this attempt; set when it becomes Pending.
    pub decimals: Option<u8>,
    /// Settled recipients. Sorted by plan position once terminal.
    pub results: Vec<RecipientResult>,
}

impl BatchAttempt {
    /// Fresh attempt with no results.
    pub fn new(number: u64) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    pub fn result_for(&self, id: RecipientId) -> Option<&RecipientResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn outcome_for(&self, id: RecipientId) -> Option<&RecipientOutcome> {
        self.result_for(id).map(|r| &r.outcome)
    }

    pub fn counts(&self) -> OutcomeCounts {
        let success_count = self.results.iter().filter(|r| r.outcome.is_success()).count();
        OutcomeCounts {
            success_count,
            failure_count: self.results.len() - success_count,
        }
    }

    /// Every distinct transaction hash produced by the attempt, in plan order.
    pub fn tx_hashes(&self) -> Vec<TxHash> {
        let mut hashes = Vec::new();
        if let Some(primary) = self.primary_tx_hash {
            hashes.push(primary);
        }
        for hash in self.results.iter().filter_map(|r| r.outcome.tx_hash()) {
            if !hashes.contains(&hash) {
                hashes.push(hash);
            }
        }
        hashes
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}
