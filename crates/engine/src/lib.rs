//! Batch token payment engine.
//!
//! Sends a fungible token to many recipients either atomically (one
//! aggregator transaction, all-or-nothing) or, when the aggregator is not
//! deployed, as independent transfers settled in parallel.
//!
//! # Architecture
//!
//! ```text
//! rows ──► validation ──► ChainContext reads ──► planner ──► executor ──► outcome
//!          (offline)      (sender, network,      (Atomic |    (submit,     (verdict,
//!                          decimals, balance,     Fallback)    receipts)    primary hash)
//!                          aggregator probe)
//! ```
//!
//! [`BatchEngine`] drives one attempt at a time and publishes every change of
//! the current [`BatchAttempt`](batchpay_types::BatchAttempt) on a
//! `tokio::sync::watch` channel. Optional [`BatchEvent`]s describe the same
//! progress as discrete notifications.
//!
//! # Example
//!
//! ```ignore
//! use batchpay_engine::{BatchEngine, EngineConfig};
//! use batchpay_chain_rpc::{RpcChain, RpcConfig};
//!
//! let client = Arc::new(RpcChain::new(&RpcConfig::default())?);
//! let engine = BatchEngine::new(client, EngineConfig::default());
//!
//! let attempt = engine.submit_batch(session.rows()).await?;
//! println!("{} via {:?}", attempt.status, attempt.path);
//! ```

mod config;
mod engine;
mod error;
mod event;
mod executor;
mod outcome;
mod payment;
mod planner;
mod validation;

pub use config::EngineConfig;
pub use engine::BatchEngine;
pub use error::{BatchError, ValidationError};
pub use event::BatchEvent;
pub use executor::{execute, Execution, ExecutionUpdate};
pub use outcome::{aggregate, primary_tx_hash, AttemptFailure};
pub use payment::PaymentReceipt;
pub use planner::{plan_transfers, BatchPlan, CallPlan, CallPlanEntry, PlannedTransfer};
pub use validation::{check_rows, ValidRow};
