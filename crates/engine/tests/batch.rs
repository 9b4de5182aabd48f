//! End-to-end batch submissions against the in-memory chain.

mod common;

use alloy_primitives::U256;
use batchpay_chain_memory::ChainCall;
use batchpay_engine::{AttemptFailure, BatchError, BatchEvent, ValidationError};
use batchpay_types::{BatchStatus, ExecutionPath, FailureReason, RecipientId, RecipientOutcome};
use common::*;
use std::time::Duration;
use tracing_test::traced_test;

#[tokio::test]
async fn test_invalid_addresses_make_no_network_calls() {
    let h = Harness::new(100, true);
    let rows = rows(&[("0x1234", "1"), ("bob.eth", "2")]);

    let err = h.engine.submit_batch(&rows).await.unwrap_err();

    assert_eq!(
        err,
        BatchError::ValidationFailed {
            reason: ValidationError::InvalidAddresses { count: 2 }
        }
    );
    assert_eq!(h.chain.call_count(), 0);
    assert_eq!(h.engine.status(), BatchStatus::Idle);
    assert_eq!(h.engine.path(), None);
}

#[tokio::test]
async fn test_empty_batch_is_refused() {
    let h = Harness::new(100, true);
    let err = h.engine.submit_batch(&rows(&[("", "")])).await.unwrap_err();
    assert_eq!(
        err,
        BatchError::ValidationFailed {
            reason: ValidationError::MissingRecipients
        }
    );
    assert_eq!(h.chain.call_count(), 0);
}

#[tokio::test]
async fn test_insufficient_balance_submits_nothing() {
    let h = Harness::new(10, true);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));

    let err = h
        .engine
        .submit_batch(&rows(&[(&a, "6"), (&b, "4.5")]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BatchError::ValidationFailed {
            reason: ValidationError::InsufficientBalance {
                required: "10.5".into(),
                available: "10".into()
            }
        }
    );
    assert!(h.chain.sent_transactions().is_empty());
    assert_eq!(h.engine.status(), BatchStatus::Idle);
}

#[tokio::test]
async fn test_excess_precision_is_rejected_after_reading_decimals() {
    let h = Harness::new(10, true);
    let a = recipient_str(0xa1);

    let err = h
        .engine
        .submit_batch(&rows(&[(&a, "1.0000001")]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BatchError::ValidationFailed {
            reason: ValidationError::ExcessPrecision {
                count: 1,
                decimals: DECIMALS
            }
        }
    );
    assert!(h.chain.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_atomic_batch_confirms() {
    let mut h = Harness::new(100, true);
    let (a, b, c) = (recipient_str(0xa1), recipient_str(0xb2), recipient_str(0xc3));

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "2.5"), (&c, "3")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Confirmed);
    assert_eq!(attempt.path, Some(ExecutionPath::Atomic));
    let hash = attempt.primary_tx_hash.unwrap();
    assert!(attempt
        .results
        .iter()
        .all(|r| r.outcome == RecipientOutcome::Success { tx_hash: hash }));

    // One transaction, addressed to the aggregator.
    let sent = h.chain.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.to, h.engine.config().chain.aggregator);

    assert_eq!(h.balance_of(recipient(0xa1)), units(1));
    assert_eq!(h.balance_of(recipient(0xb2)), U256::from(2_500_000u64));
    assert_eq!(h.balance_of(recipient(0xc3)), units(3));
    assert_eq!(h.balance_of(sender()), U256::from(93_500_000u64));

    assert_eq!(h.engine.tx_hashes(), vec![hash]);
    assert_eq!(
        h.engine.explorer_links(),
        vec![format!("https://explore.tempo.xyz/tx/{}", hash)]
    );
    assert_eq!(attempt.failure(), None);

    let events = h.drain_events();
    assert!(!events
        .iter()
        .any(|e| matches!(e, BatchEvent::ModeChanged { .. })));
}

#[tokio::test]
async fn test_atomic_batch_preserves_display_order() {
    let h = Harness::new(100, true);
    let (a, b, c) = (recipient_str(0xa1), recipient_str(0xb2), recipient_str(0xc3));

    h.engine
        .submit_batch(&rows(&[(&c, "3"), ("", ""), (&a, "1"), (&b, "2")]))
        .await
        .unwrap();

    let sent = h.chain.sent_transactions();
    let expected = batchpay_engine::CallPlan::new(
        h.engine.config().chain.token,
        vec![
            planned(1, 0, 0xc3, 3),
            planned(3, 1, 0xa1, 1),
            planned(4, 2, 0xb2, 2),
        ],
    );
    assert_eq!(sent[0].1.data, expected.calldata());
}

fn planned(id: u64, position: usize, byte: u8, whole: u64) -> batchpay_engine::PlannedTransfer {
    batchpay_engine::PlannedTransfer {
        id: RecipientId(id),
        position,
        recipient: recipient(byte),
        amount: units(whole),
    }
}

#[tokio::test]
async fn test_atomic_failing_subcall_fails_every_row() {
    let h = Harness::new(100, true);
    let (a, b, c) = (recipient_str(0xa1), recipient_str(0xb2), recipient_str(0xc3));
    h.chain.revert_transfers_to(recipient(0xb2));

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1"), (&c, "1")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Failed);
    assert_eq!(attempt.path, Some(ExecutionPath::Atomic));
    assert_eq!(attempt.counts().success_count, 0);
    assert_eq!(attempt.counts().failure_count, 3);
    for result in &attempt.results {
        let reason = result.outcome.failure_reason().unwrap();
        assert_eq!(reason, &FailureReason::BatchReverted);
        assert_eq!(reason.to_string(), "batch reverted");
    }

    // Nothing moved.
    assert_eq!(h.balance_of(sender()), units(100));
    assert_eq!(h.balance_of(recipient(0xa1)), units(0));

    let hash = attempt.primary_tx_hash.unwrap();
    assert_eq!(attempt.failure(), Some(BatchError::OnChainRevert { tx_hash: hash }));
}

#[tokio::test]
async fn test_atomic_submission_rejected() {
    let h = Harness::new(100, true);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));
    h.chain
        .reject_submissions_to(recipient(0xb2), "user rejected the request");

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Failed);
    assert_eq!(attempt.primary_tx_hash, None);
    assert!(attempt.results.iter().all(|r| matches!(
        &r.outcome,
        RecipientOutcome::Failure {
            reason: FailureReason::SubmissionRejected(reason),
            tx_hash: None,
        } if reason.contains("user rejected the request")
    )));
    assert!(matches!(
        attempt.failure(),
        Some(BatchError::SubmissionRejected(_))
    ));
    assert!(h.engine.tx_hashes().is_empty());
}

#[tokio::test]
async fn test_atomic_receipt_timeout_keeps_hash() {
    let h = Harness::with_receipts(
        100,
        true,
        batchpay_chain::ReceiptPolicy {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(30),
        },
    );
    h.chain.withhold_receipts();
    let a = recipient_str(0xa1);

    let attempt = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();

    assert_eq!(attempt.status, BatchStatus::Failed);
    let hash = attempt.primary_tx_hash.unwrap();
    assert!(matches!(
        &attempt.results[0].outcome,
        RecipientOutcome::Failure {
            reason: FailureReason::ConfirmationFailed(_),
            tx_hash: Some(kept),
        } if *kept == hash
    ));
    assert!(matches!(
        attempt.failure(),
        Some(BatchError::ConfirmationFailed(_))
    ));
}

#[tokio::test]
#[traced_test]
async fn test_fallback_partial_failure() {
    let mut h = Harness::new(100, false);
    let (a, b, c) = (recipient_str(0xa1), recipient_str(0xb2), recipient_str(0xc3));
    h.chain.revert_transfers_to(recipient(0xb2));

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "2"), (&c, "3")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Failed);
    assert_eq!(attempt.path, Some(ExecutionPath::Fallback));
    assert_eq!(attempt.counts().success_count, 2);
    assert_eq!(attempt.counts().failure_count, 1);
    assert_eq!(attempt.primary_tx_hash, None);

    let first = attempt.outcome_for(RecipientId(1)).unwrap();
    let third = attempt.outcome_for(RecipientId(3)).unwrap();
    assert!(first.is_success() && third.is_success());
    assert_ne!(first.tx_hash(), third.tx_hash());

    let second = attempt.outcome_for(RecipientId(2)).unwrap();
    assert_eq!(second.failure_reason(), Some(&FailureReason::Reverted));
    assert!(second.tx_hash().is_some());

    // Settled rows are reported in plan order.
    let ids: Vec<_> = attempt.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RecipientId(1), RecipientId(2), RecipientId(3)]);

    assert_eq!(h.balance_of(recipient(0xa1)), units(1));
    assert_eq!(h.balance_of(recipient(0xb2)), units(0));
    assert_eq!(h.balance_of(recipient(0xc3)), units(3));
    assert_eq!(h.engine.tx_hashes().len(), 3);

    assert_eq!(
        attempt.failure(),
        Some(BatchError::PartialFailure {
            success_count: 2,
            failure_count: 1
        })
    );

    let mode_changes = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, BatchEvent::ModeChanged { .. }))
        .count();
    assert_eq!(mode_changes, 1);
    assert!(logs_contain("Aggregator unavailable"));
}

#[tokio::test]
async fn test_fallback_confirms_with_first_hash_as_primary() {
    let h = Harness::new(100, false);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Confirmed);
    assert_eq!(
        attempt.primary_tx_hash,
        attempt.outcome_for(RecipientId(1)).unwrap().tx_hash()
    );
    assert_eq!(h.engine.explorer_links().len(), 2);
}

#[tokio::test]
async fn test_fallback_submits_everything_before_awaiting_receipts() {
    let h = Harness::new(100, false);
    let addrs: Vec<String> = (1..=4).map(recipient_str).collect();
    let entries: Vec<(&str, &str)> = addrs.iter().map(|a| (a.as_str(), "1")).collect();

    h.engine.submit_batch(&rows(&entries)).await.unwrap();

    let calls = h.chain.calls();
    let last_send = calls
        .iter()
        .rposition(|c| matches!(c, ChainCall::SendTransaction { .. }))
        .unwrap();
    let first_receipt = calls
        .iter()
        .position(|c| matches!(c, ChainCall::Receipt(_)))
        .unwrap();
    assert!(last_send < first_receipt);
    assert_eq!(h.chain.sent_transactions().len(), 4);
}

#[tokio::test]
async fn test_fallback_rejection_is_per_recipient() {
    let h = Harness::new(100, false);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));
    h.chain.reject_submissions_to(recipient(0xa1), "user rejected the request");

    let attempt = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1")]))
        .await
        .unwrap();

    assert_eq!(attempt.status, BatchStatus::Failed);
    let rejected = attempt.outcome_for(RecipientId(1)).unwrap();
    assert_eq!(rejected.tx_hash(), None);
    assert!(matches!(
        rejected.failure_reason(),
        Some(FailureReason::SubmissionRejected(_))
    ));
    assert!(attempt.outcome_for(RecipientId(2)).unwrap().is_success());
}

#[tokio::test]
async fn test_failed_probe_falls_back() {
    let mut h = Harness::new(100, true);
    h.chain.fail_code_lookup();
    let a = recipient_str(0xa1);

    let attempt = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();

    assert_eq!(attempt.path, Some(ExecutionPath::Fallback));
    assert_eq!(attempt.status, BatchStatus::Confirmed);
    let mode_changes: Vec<_> = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, BatchEvent::ModeChanged { .. }))
        .collect();
    assert_eq!(
        mode_changes,
        vec![BatchEvent::ModeChanged {
            attempt: 1,
            path: ExecutionPath::Fallback
        }]
    );
}

#[tokio::test]
async fn test_resubmission_starts_fresh_attempt() {
    let h = Harness::new(100, false);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));
    h.chain.revert_transfers_to(recipient(0xb2));

    let first = h
        .engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1")]))
        .await
        .unwrap();
    assert_eq!(first.status, BatchStatus::Failed);
    assert_eq!(first.number, 1);

    // A refused resubmission still replaces the previous attempt.
    h.engine.submit_batch(&rows(&[("0x12", "1")])).await.unwrap_err();
    let current = h.engine.attempt();
    assert_eq!(current.number, 2);
    assert_eq!(current.status, BatchStatus::Idle);
    assert!(current.results.is_empty());
    assert!(h.engine.tx_hashes().is_empty());

    let third = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();
    assert_eq!(third.number, 3);
    assert_eq!(third.status, BatchStatus::Confirmed);
    assert_eq!(third.results.len(), 1);
}

#[tokio::test]
async fn test_network_switch_refusal_is_not_fatal() {
    let mut h = Harness::new(100, true);
    h.chain.reject_network_switch();
    let a = recipient_str(0xa1);

    let attempt = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();

    assert_eq!(attempt.status, BatchStatus::Confirmed);
    assert!(h
        .drain_events()
        .iter()
        .any(|e| matches!(e, BatchEvent::NetworkSwitchIgnored { attempt: 1, .. })));
}

#[tokio::test]
async fn test_network_switch_is_requested() {
    let h = Harness::new(100, true);
    let a = recipient_str(0xa1);
    h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();
    assert_eq!(h.chain.active_chain_id(), h.engine.config().chain.chain_id);
}

#[tokio::test]
async fn test_decimals_failure_aborts_before_balance() {
    let h = Harness::new(100, true);
    h.chain.fail_decimals_read();
    let a = recipient_str(0xa1);

    let err = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap_err();

    assert!(matches!(err, BatchError::MetadataReadFailed(_)));
    let reads = h
        .chain
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ChainCall::Call { .. }))
        .count();
    assert_eq!(reads, 1);
    assert!(h.chain.sent_transactions().is_empty());
    assert_eq!(h.engine.status(), BatchStatus::Idle);
}

#[tokio::test]
async fn test_balance_failure_aborts() {
    let h = Harness::new(100, true);
    h.chain.fail_balance_read();
    let a = recipient_str(0xa1);

    let err = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap_err();

    assert!(matches!(err, BatchError::BalanceReadFailed(_)));
    assert!(h.chain.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_disconnected_wallet() {
    let h = Harness::new(100, true);
    h.chain.disconnect();
    let a = recipient_str(0xa1);

    let err = h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap_err();
    assert!(matches!(err, BatchError::WalletUnavailable(_)));
}

#[tokio::test]
async fn test_second_submission_while_pending_is_refused() {
    let h = Harness::with_receipts(
        100,
        true,
        batchpay_chain::ReceiptPolicy {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        },
    );
    h.chain.set_confirmation_polls(5);
    let a = recipient_str(0xa1);
    let batch = rows(&[(&a, "1")]);

    let mut status = h.engine.subscribe();
    let first = h.engine.submit_batch(&batch);
    let second = async {
        status
            .wait_for(|attempt| attempt.status == BatchStatus::Pending)
            .await
            .unwrap();
        h.engine.submit_batch(&batch).await
    };

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap().status, BatchStatus::Confirmed);
    assert_eq!(second.unwrap_err(), BatchError::AttemptInFlight);
}

#[tokio::test]
async fn test_event_sequence() {
    let mut h = Harness::new(100, false);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));

    h.engine
        .submit_batch(&rows(&[(&a, "1"), (&b, "1")]))
        .await
        .unwrap();
    let events = h.drain_events();

    assert_eq!(events.first(), Some(&BatchEvent::AttemptStarted { attempt: 1, rows: 2 }));
    assert_eq!(
        events.last(),
        Some(&BatchEvent::StatusChanged {
            attempt: 1,
            status: BatchStatus::Confirmed
        })
    );
    let pending = events
        .iter()
        .position(|e| {
            *e == BatchEvent::StatusChanged {
                attempt: 1,
                status: BatchStatus::Pending,
            }
        })
        .unwrap();
    let mode = events
        .iter()
        .position(|e| matches!(e, BatchEvent::ModeChanged { .. }))
        .unwrap();
    assert!(pending < mode);

    let submitted = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::TransactionSubmitted { .. }))
        .count();
    let settled = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::RecipientSettled { .. }))
        .count();
    assert_eq!(submitted, 2);
    assert_eq!(settled, 2);
}

#[tokio::test]
async fn test_status_stream_sees_terminal_snapshot() {
    let h = Harness::new(100, true);
    let mut status = h.engine.subscribe();
    let a = recipient_str(0xa1);

    h.engine.submit_batch(&rows(&[(&a, "1")])).await.unwrap();

    assert!(status.has_changed().unwrap());
    let latest = status.borrow_and_update().clone();
    assert_eq!(latest.status, BatchStatus::Confirmed);
    assert_eq!(latest, h.engine.attempt());
}

#[tokio::test]
async fn test_whitespace_address_rejects_whole_batch() {
    let h = Harness::new(100, true);
    let a = recipient_str(0xa1);

    let err = h
        .engine
        .submit_batch(&rows(&[("   ", "5"), (&a, "1")]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BatchError::ValidationFailed {
            reason: ValidationError::InvalidAddresses { count: 1 }
        }
    );
    assert_eq!(h.chain.call_count(), 0);
    assert_eq!(h.balance_of(recipient(0xa1)), U256::ZERO);
}

#[tokio::test]
async fn test_dropped_caller_does_not_abort_pending_attempt() {
    let h = Harness::with_receipts(
        100,
        false,
        batchpay_chain::ReceiptPolicy {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        },
    );
    h.chain.set_confirmation_polls(5);
    let (a, b) = (recipient_str(0xa1), recipient_str(0xb2));
    let batch = rows(&[(&a, "1"), (&b, "2")]);

    // Stop waiting as soon as the attempt is Pending.
    let mut status = h.engine.subscribe();
    tokio::select! {
        _ = h.engine.submit_batch(&batch) => panic!("attempt settled before the caller gave up"),
        pending = status.wait_for(|attempt| attempt.status == BatchStatus::Pending) => {
            pending.unwrap();
        }
    }

    assert_eq!(h.engine.status(), BatchStatus::Pending);
    assert_eq!(
        h.engine.submit_batch(&batch).await.unwrap_err(),
        BatchError::AttemptInFlight
    );
    assert_eq!(h.engine.pay(&a, "1").await.unwrap_err(), BatchError::AttemptInFlight);

    let settled = status
        .wait_for(|attempt| attempt.status.is_final())
        .await
        .unwrap()
        .clone();
    assert_eq!(settled.number, 1);
    assert_eq!(settled.status, BatchStatus::Confirmed);
    assert_eq!(settled.results.len(), 2);
    assert_eq!(h.chain.sent_transactions().len(), 2);
    assert_eq!(h.balance_of(recipient(0xa1)), units(1));
    assert_eq!(h.balance_of(recipient(0xb2)), units(2));

    // The lock is released once the verdict is published.
    let next = h.engine.submit_batch(&batch).await.unwrap();
    assert_eq!(next.number, 2);
    assert_eq!(next.status, BatchStatus::Confirmed);
}
