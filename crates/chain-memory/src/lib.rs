//! In-memory chain backend.
//!
//! [`MemoryChain`] implements [`batchpay_chain::ChainClient`] without a node:
//! a single token, an optional aggregator, and injectable faults (rejected
//! submissions, reverting recipients, failed reads, delayed receipts). Used
//! by the engine's tests and by the CLI's `--dry-run` mode.

mod chain;
mod execution;

pub use chain::{ChainCall, MemoryChain};
