//! Core types for batch token payments.
//!
//! This crate provides the value types shared by every other crate in the
//! workspace:
//!
//! - **Addresses**: structural validation of recipient identifiers
//! - **Amounts**: exact conversion between human decimals and base units
//! - **Recipients**: payment rows and the editable session owning them
//! - **Attempts**: batch status machine and per-recipient outcomes
//!
//! # Design Philosophy
//!
//! This crate performs no I/O and does not depend on any other workspace
//! crate, making it the foundation layer.

mod address;
mod amount;
mod attempt;
mod recipient;

pub use address::{is_valid_address, parse_address, AddressError, ADDRESS_HEX_LEN, ADDRESS_PREFIX};
pub use amount::{check_human, sum_base_units, sum_human, to_base_units, to_human, AmountError};
pub use attempt::{
    BatchAttempt, BatchStatus, ExecutionPath, FailureReason, OutcomeCounts, RecipientOutcome,
    RecipientResult, TokenContext,
};
pub use recipient::{AddressState, BatchSummary, RecipientEntry, RecipientId, RecipientSession};

// Re-export EVM primitives so downstream crates agree on one version.
pub use alloy_primitives::{Address, Bytes, TxHash, U256};
