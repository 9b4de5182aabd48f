//! Human-readable output.

use batchpay_chain::{short_hash, ChainConfig};
use batchpay_engine::{AttemptFailure, BatchEvent, PaymentReceipt};
use batchpay_types::{
    to_human, BatchAttempt, BatchSummary, RecipientOutcome, RecipientResult, RecipientSession,
};
use tokio::sync::mpsc;
use tracing::info;

/// Log engine events as they arrive until the engine is dropped.
pub async fn follow(mut events: mpsc::UnboundedReceiver<BatchEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::AttemptStarted { attempt, rows } => {
                info!(attempt, rows, "Attempt started");
            }
            BatchEvent::NetworkSwitchIgnored { reason, .. } => {
                info!(%reason, "Staying on the current network");
            }
            BatchEvent::StatusChanged { status, .. } => info!(%status, "Status"),
            BatchEvent::ModeChanged { path, .. } => info!(%path, "Execution mode changed"),
            BatchEvent::TransactionSubmitted {
                tx_hash,
                recipients,
                ..
            } => {
                info!(tx = %short_hash(&tx_hash), recipients = recipients.len(), "Submitted");
            }
            BatchEvent::RecipientSettled { result, .. } => {
                info!(
                    recipient = %result.recipient,
                    success = result.outcome.is_success(),
                    "Settled"
                );
            }
        }
    }
}

pub fn print_summary(summary: &BatchSummary) {
    println!("{} recipient(s), total {}", summary.filled_rows, summary.total);
}

/// Print the verdict and one line per recipient.
pub fn print_attempt(attempt: &BatchAttempt, session: &RecipientSession, chain: &ChainConfig) {
    let path = attempt
        .path
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Attempt #{}: {} ({})", attempt.number, attempt.status, path);

    for result in &attempt.results {
        let amount = display_amount(attempt, result, session);
        let verdict = match &result.outcome {
            RecipientOutcome::Success { tx_hash } => format!("ok       {}", short_hash(tx_hash)),
            RecipientOutcome::Failure { reason, tx_hash } => match tx_hash {
                Some(hash) => format!("FAILED   {} ({})", short_hash(hash), reason),
                None => format!("FAILED   ({})", reason),
            },
        };
        println!(
            "  {:<5} {} {:>12}  {}",
            result.id.to_string(),
            result.recipient,
            amount,
            verdict
        );
    }

    if let Some(failure) = attempt.failure() {
        println!("{}", failure);
    }
    for hash in attempt.tx_hashes() {
        println!("  {}", chain.explorer_tx_url(&hash));
    }
}

/// Amount actually sent to a recipient, in whole tokens.
fn display_amount(
    attempt: &BatchAttempt,
    result: &RecipientResult,
    session: &RecipientSession,
) -> String {
    match (attempt.decimals, session.get(result.id)) {
        (Some(decimals), _) => to_human(result.amount, decimals),
        (None, Some(row)) => row.amount.trim().to_string(),
        (None, None) => format!("{} base units", result.amount),
    }
}

pub fn print_payment(receipt: &PaymentReceipt) {
    println!("Paid in {}", short_hash(&receipt.tx_hash));
    println!("  {}", receipt.explorer_url);
}
