//! The caller-facing batch engine.

use crate::config::EngineConfig;
use crate::error::BatchError;
use crate::event::BatchEvent;
use crate::executor::{self, ExecutionUpdate};
use crate::outcome;
use crate::planner::{plan_transfers, BatchPlan, PlannedTransfer};
use crate::validation::check_rows;
use alloy_primitives::{Address, TxHash};
use batchpay_chain::{ChainClient, ChainContext, ReceiptPolicy, TokenReadError};
use batchpay_types::{BatchAttempt, BatchStatus, ExecutionPath, RecipientEntry};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Instrument, Span};

/// Orchestrates batch payments against one chain client.
///
/// Holds the current [`BatchAttempt`] and publishes every change of it to
/// subscribers. Each `submit_batch` call replaces the previous attempt.
///
/// Once an attempt is Pending it is settled on its own task. Dropping the
/// `submit_batch` future (a caller-side timeout, `select!`) stops the wait,
/// not the attempt: it still reaches a terminal status, and the engine
/// refuses new attempts until it does.
pub struct BatchEngine<C> {
    ctx: ChainContext<C>,
    config: EngineConfig,
    publisher: Publisher,
    attempts: AtomicU64,
    in_flight: Arc<AtomicBool>,
}

/// Writes attempt state and events. Cloned into settlement tasks.
#[derive(Clone)]
pub(crate) struct Publisher {
    current: Arc<watch::Sender<BatchAttempt>>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

/// Clears the in-flight flag when the attempt it belongs to ends.
///
/// Owned by whichever future finishes the attempt: the caller's future
/// before Pending, the settlement task after.
pub(crate) struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<C: ChainClient + 'static> BatchEngine<C> {
    pub fn new(client: Arc<C>, config: EngineConfig) -> Self {
        let (current, _) = watch::channel(BatchAttempt::default());
        Self {
            ctx: ChainContext::new(client, config.chain.clone()),
            config,
            publisher: Publisher {
                current: Arc::new(current),
                events: None,
            },
            attempts: AtomicU64::new(0),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deliver [`BatchEvent`]s to `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.publisher.events = Some(events);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn context(&self) -> &ChainContext<C> {
        &self.ctx
    }

    /// Status stream: the receiver always holds the latest attempt snapshot.
    pub fn subscribe(&self) -> watch::Receiver<BatchAttempt> {
        self.publisher.current.subscribe()
    }

    /// Snapshot of the current attempt.
    pub fn attempt(&self) -> BatchAttempt {
        self.publisher.snapshot()
    }

    pub fn status(&self) -> BatchStatus {
        self.publisher.current.borrow().status
    }

    pub fn path(&self) -> Option<ExecutionPath> {
        self.publisher.current.borrow().path
    }

    pub fn primary_tx_hash(&self) -> Option<TxHash> {
        self.publisher.current.borrow().primary_tx_hash
    }

    pub fn tx_hashes(&self) -> Vec<TxHash> {
        self.publisher.current.borrow().tx_hashes()
    }

    /// Explorer pages of every transaction of the current attempt.
    pub fn explorer_links(&self) -> Vec<String> {
        self.tx_hashes()
            .iter()
            .map(|hash| self.config.chain.explorer_tx_url(hash))
            .collect()
    }

    /// Validate, plan, submit and settle a batch.
    ///
    /// Returns `Err` if the attempt never left Idle (validation, wallet,
    /// token reads, or another attempt in flight). Once Pending, the attempt
    /// always runs to a terminal status and is returned as `Ok`; use
    /// [`AttemptFailure::failure`](crate::AttemptFailure::failure) to
    /// classify a Failed attempt.
    pub async fn submit_batch(&self, rows: &[RecipientEntry]) -> Result<BatchAttempt, BatchError> {
        let guard = self.begin()?;

        let number = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.publisher.current.send_replace(BatchAttempt::new(number));
        self.emit(BatchEvent::AttemptStarted {
            attempt: number,
            rows: rows.len(),
        });

        let valid = check_rows(rows)?;
        let sender = self.ctx.sender().await.map_err(BatchError::WalletUnavailable)?;
        self.ensure_network(number).await;

        let token = self.ctx.load_token(sender).await.map_err(|e| match e {
            TokenReadError::Decimals(e) => BatchError::MetadataReadFailed(e),
            TokenReadError::Balance(e) => BatchError::BalanceReadFailed(e),
        })?;
        let transfers = plan_transfers(&valid, &token)?;

        info!(
            attempt = number,
            %sender,
            recipients = transfers.len(),
            decimals = token.decimals,
            "Batch validated"
        );
        self.publisher
            .current
            .send_modify(|attempt| attempt.decimals = Some(token.decimals));
        self.publisher.set_status(number, BatchStatus::Pending);

        let settlement = Settlement {
            ctx: self.ctx.clone(),
            receipts: self.config.receipts,
            publisher: self.publisher.clone(),
            attempt: number,
            sender,
            token: token.token,
        };
        tokio::spawn(settlement.run(transfers, guard).instrument(Span::current()))
            .await
            .map_err(|e| BatchError::SettlementInterrupted(e.to_string()))
    }

    /// Claim the engine for one attempt.
    pub(crate) fn begin(&self) -> Result<InFlightGuard, BatchError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| BatchError::AttemptInFlight)?;
        Ok(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }

    /// Ask for the configured network; a refusal only produces a warning.
    pub(crate) async fn ensure_network(&self, attempt: u64) {
        if let Err(e) = self.ctx.ensure_network().await {
            warn!(
                attempt,
                chain_id = self.config.chain.chain_id,
                error = %e,
                "Network switch failed, continuing on the current network"
            );
            self.emit(BatchEvent::NetworkSwitchIgnored {
                attempt,
                reason: e.to_string(),
            });
        }
    }

    pub(crate) fn emit(&self, event: BatchEvent) {
        self.publisher.emit(event);
    }
}

/// Everything a Pending attempt needs to reach its verdict.
struct Settlement<C> {
    ctx: ChainContext<C>,
    receipts: ReceiptPolicy,
    publisher: Publisher,
    attempt: u64,
    sender: Address,
    token: Address,
}

impl<C: ChainClient + 'static> Settlement<C> {
    /// Probe, execute and publish the verdict. The in-flight guard is
    /// released only after the terminal status is visible to subscribers.
    async fn run(self, transfers: Vec<PlannedTransfer>, _guard: InFlightGuard) -> BatchAttempt {
        let number = self.attempt;
        let publisher = &self.publisher;

        let aggregator_available = self.ctx.probe_aggregator().await;
        let plan = BatchPlan::build(self.token, transfers, aggregator_available);
        let path = plan.path();
        publisher
            .current
            .send_modify(|attempt| attempt.path = Some(path));
        if path == ExecutionPath::Fallback {
            warn!(
                attempt = number,
                aggregator = %self.ctx.config().aggregator,
                "Aggregator unavailable, sending transfers individually"
            );
            publisher.emit(BatchEvent::ModeChanged {
                attempt: number,
                path,
            });
        }

        let execution = executor::execute(&self.ctx, self.sender, &plan, &self.receipts, |update| {
            publisher.on_update(number, update)
        })
        .await;

        let mut results = execution.results;
        results.sort_by_key(|r| r.position);
        let status = outcome::aggregate(path, &results);
        let primary_tx_hash =
            outcome::primary_tx_hash(path, execution.aggregate_tx_hash, status, &results);

        publisher.current.send_modify(|attempt| {
            attempt.results = results;
            attempt.primary_tx_hash = primary_tx_hash;
        });
        publisher.set_status(number, status);

        let snapshot = publisher.snapshot();
        let counts = snapshot.counts();
        info!(
            attempt = number,
            %path,
            %status,
            success_count = counts.success_count,
            failure_count = counts.failure_count,
            primary_tx_hash = ?snapshot.primary_tx_hash,
            "Batch settled"
        );

        snapshot
    }
}

impl Publisher {
    fn snapshot(&self) -> BatchAttempt {
        self.current.borrow().clone()
    }

    pub(crate) fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn set_status(&self, attempt: u64, status: BatchStatus) {
        let mut changed = false;
        self.current.send_if_modified(|current| {
            if current.status.can_transition_to(status) {
                current.status = status;
                changed = true;
            }
            changed
        });

        if changed {
            self.emit(BatchEvent::StatusChanged { attempt, status });
        } else {
            warn!(attempt, %status, "Ignoring illegal status transition");
        }
    }

    fn on_update(&self, attempt: u64, update: ExecutionUpdate) {
        match update {
            ExecutionUpdate::Submitted {
                tx_hash,
                recipients,
            } => {
                self.current.send_modify(|current| {
                    if current.path == Some(ExecutionPath::Atomic) {
                        current.primary_tx_hash = Some(tx_hash);
                    }
                });
                self.emit(BatchEvent::TransactionSubmitted {
                    attempt,
                    tx_hash,
                    recipients,
                });
            }
            ExecutionUpdate::Settled(result) => {
                self.current
                    .send_modify(|current| current.results.push(result.clone()));
                self.emit(BatchEvent::RecipientSettled { attempt, result });
            }
        }
    }
}
