//! Submitting a plan and collecting per-recipient outcomes.
//!
//! ```text
//! Atomic:    submit aggregate3 ──► receipt ──► every row shares the verdict
//!
//! Fallback:  submit #0 ─┐
//!            submit #1 ─┼─► (each) receipt ──► row verdict, in arrival order
//!            submit #n ─┘
//! ```
//!
//! Fallback transfers are driven concurrently from the calling task with
//! [`FuturesUnordered`]: every submission starts before any receipt is
//! awaited, and the call returns only once every transfer has settled.
//! Nothing is retried or cancelled.

use crate::planner::{BatchPlan, CallPlan, PlannedTransfer};
use alloy_primitives::{Address, TxHash};
use batchpay_chain::{abi, ChainClient, ChainContext, ChainError, Receipt, ReceiptPolicy, TransactionRequest};
use batchpay_types::{FailureReason, RecipientId, RecipientOutcome, RecipientResult};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

/// Progress reported while a plan executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionUpdate {
    Submitted {
        tx_hash: TxHash,
        recipients: Vec<RecipientId>,
    },
    Settled(RecipientResult),
}

/// Everything a plan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Hash of the aggregator transaction (atomic only).
    pub aggregate_tx_hash: Option<TxHash>,
    /// One result per planned transfer, in plan order.
    pub results: Vec<RecipientResult>,
}

/// Execute `plan` from `sender`, reporting progress to `observe`.
pub async fn execute<C, F>(
    ctx: &ChainContext<C>,
    sender: Address,
    plan: &BatchPlan,
    policy: &ReceiptPolicy,
    observe: F,
) -> Execution
where
    C: ChainClient,
    F: FnMut(ExecutionUpdate),
{
    match plan {
        BatchPlan::Atomic(call_plan) => execute_atomic(ctx, sender, call_plan, policy, observe).await,
        BatchPlan::Fallback(transfers) => {
            execute_fallback(ctx, sender, transfers, policy, observe).await
        }
    }
}

async fn execute_atomic<C, F>(
    ctx: &ChainContext<C>,
    sender: Address,
    plan: &CallPlan,
    policy: &ReceiptPolicy,
    mut observe: F,
) -> Execution
where
    C: ChainClient,
    F: FnMut(ExecutionUpdate),
{
    let request = TransactionRequest::new(ctx.config().aggregator, plan.calldata()).from(sender);

    let (aggregate_tx_hash, outcome) = match ctx.submit(&request).await {
        Err(e) => {
            warn!(error = %e, "Batch submission rejected");
            let outcome = RecipientOutcome::Failure {
                reason: FailureReason::SubmissionRejected(e.to_string()),
                tx_hash: None,
            };
            (None, outcome)
        }
        Ok(tx_hash) => {
            info!(%tx_hash, transfers = plan.transfers().len(), "Batch transaction submitted");
            observe(ExecutionUpdate::Submitted {
                tx_hash,
                recipients: plan.transfers().iter().map(|t| t.id).collect(),
            });

            let outcome = match ctx.wait_for_receipt(tx_hash, policy).await {
                Ok(receipt) if receipt.success => RecipientOutcome::Success { tx_hash },
                Ok(_) => RecipientOutcome::Failure {
                    reason: FailureReason::BatchReverted,
                    tx_hash: Some(tx_hash),
                },
                Err(e) => RecipientOutcome::Failure {
                    reason: FailureReason::ConfirmationFailed(e.to_string()),
                    tx_hash: Some(tx_hash),
                },
            };
            (Some(tx_hash), outcome)
        }
    };

    let results: Vec<RecipientResult> = plan
        .transfers()
        .iter()
        .map(|transfer| settle(transfer, outcome.clone()))
        .collect();
    for result in &results {
        observe(ExecutionUpdate::Settled(result.clone()));
    }

    Execution {
        aggregate_tx_hash,
        results,
    }
}

/// Progress of one fallback transfer.
enum Step {
    Submitted {
        index: usize,
        result: Result<TxHash, ChainError>,
    },
    Included {
        index: usize,
        tx_hash: TxHash,
        result: Result<Receipt, ChainError>,
    },
}

async fn execute_fallback<C, F>(
    ctx: &ChainContext<C>,
    sender: Address,
    transfers: &[PlannedTransfer],
    policy: &ReceiptPolicy,
    mut observe: F,
) -> Execution
where
    C: ChainClient,
    F: FnMut(ExecutionUpdate),
{
    let token = ctx.config().token;
    let mut in_flight: FuturesUnordered<BoxFuture<'_, Step>> = transfers
        .iter()
        .enumerate()
        .map(move |(index, transfer)| {
            let request =
                TransactionRequest::new(token, abi::encode_transfer(transfer.recipient, transfer.amount))
                    .from(sender);
            async move {
                Step::Submitted {
                    index,
                    result: ctx.submit(&request).await,
                }
            }
            .boxed()
        })
        .collect();

    let mut settled: Vec<Option<RecipientResult>> = vec![None; transfers.len()];

    while let Some(step) = in_flight.next().await {
        match step {
            Step::Submitted {
                index,
                result: Ok(tx_hash),
            } => {
                let transfer = &transfers[index];
                debug!(%tx_hash, recipient = %transfer.recipient, "Transfer submitted");
                observe(ExecutionUpdate::Submitted {
                    tx_hash,
                    recipients: vec![transfer.id],
                });
                in_flight.push(
                    async move {
                        Step::Included {
                            index,
                            tx_hash,
                            result: ctx.wait_for_receipt(tx_hash, policy).await,
                        }
                    }
                    .boxed(),
                );
            }
            Step::Submitted {
                index,
                result: Err(e),
            } => {
                let transfer = &transfers[index];
                warn!(recipient = %transfer.recipient, error = %e, "Transfer submission rejected");
                let result = settle(
                    transfer,
                    RecipientOutcome::Failure {
                        reason: FailureReason::SubmissionRejected(e.to_string()),
                        tx_hash: None,
                    },
                );
                observe(ExecutionUpdate::Settled(result.clone()));
                settled[index] = Some(result);
            }
            Step::Included {
                index,
                tx_hash,
                result,
            } => {
                let outcome = match result {
                    Ok(receipt) if receipt.success => RecipientOutcome::Success { tx_hash },
                    Ok(_) => RecipientOutcome::Failure {
                        reason: FailureReason::Reverted,
                        tx_hash: Some(tx_hash),
                    },
                    Err(e) => RecipientOutcome::Failure {
                        reason: FailureReason::ConfirmationFailed(e.to_string()),
                        tx_hash: Some(tx_hash),
                    },
                };
                let result = settle(&transfers[index], outcome);
                debug!(%tx_hash, success = result.outcome.is_success(), "Transfer settled");
                observe(ExecutionUpdate::Settled(result.clone()));
                settled[index] = Some(result);
            }
        }
    }

    Execution {
        aggregate_tx_hash: None,
        results: settled.into_iter().flatten().collect(),
    }
}

fn settle(transfer: &PlannedTransfer, outcome: RecipientOutcome) -> RecipientResult {
    RecipientResult {
        id: transfer.id,
        position: transfer.position,
        recipient: transfer.recipient,
        amount: transfer.amount,
        outcome,
    }
}
