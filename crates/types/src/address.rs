//! Recipient address validation.
//!
//! Accounts are identified by a `0x` prefix followed by exactly 40 hex
//! characters. Validation is purely structural: mixed-case checksums are
//! accepted but not verified.

use alloy_primitives::Address;
use std::str::FromStr;

/// Literal prefix of every account identifier.
pub const ADDRESS_PREFIX: &str = "0x";

/// Number of hex characters following the prefix.
pub const ADDRESS_HEX_LEN: usize = 40;

/// Check whether `address` is a well-formed account identifier.
///
/// No trimming is performed; surrounding whitespace makes the address invalid.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix(ADDRESS_PREFIX) else {
        return false;
    };
    hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse a validated address string into a typed [`Address`].
pub fn parse_address(address: &str) -> Result<Address, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if !is_valid_address(address) {
        return Err(AddressError::Malformed(address.to_string()));
    }
    Address::from_str(address).map_err(|_| AddressError::Malformed(address.to_string()))
}

/// Errors from parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Malformed address: {0}")]
    Malformed(String),
}
