//! Contract interfaces the engine calls.
//!
//! - [`ITip20`]: the fungible token (`decimals`, `balanceOf`, `transfer`)
//! - [`IMulticall3`]: the aggregator executing an ordered list of sub-calls

use crate::ChainError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    /// Fungible token interface.
    interface ITip20 {
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    /// Multicall3 aggregator interface.
    interface IMulticall3 {
        /// A single call in a multicall batch.
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        /// Outcome of a single call.
        struct Call3Result {
            bool success;
            bytes returnData;
        }

        /// Execute the calls in order. Reverts if any call with
        /// `allowFailure = false` fails.
        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}

/// Calldata for `decimals()`.
pub fn encode_decimals() -> Bytes {
    ITip20::decimalsCall {}.abi_encode().into()
}

/// Calldata for `balanceOf(owner)`.
pub fn encode_balance_of(owner: Address) -> Bytes {
    ITip20::balanceOfCall { owner }.abi_encode().into()
}

/// Calldata for `transfer(to, amount)`.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    ITip20::transferCall { to, amount }.abi_encode().into()
}

/// Calldata for `aggregate3(calls)`.
pub fn encode_aggregate3(calls: Vec<IMulticall3::Call3>) -> Bytes {
    IMulticall3::aggregate3Call { calls }.abi_encode().into()
}

pub fn decode_decimals(data: &[u8]) -> Result<u8, ChainError> {
    ITip20::decimalsCall::abi_decode_returns(data)
        .map_err(|e| ChainError::Decode(format!("decimals(): {}", e)))
}

pub fn decode_balance(data: &[u8]) -> Result<U256, ChainError> {
    ITip20::balanceOfCall::abi_decode_returns(data)
        .map_err(|e| ChainError::Decode(format!("balanceOf(): {}", e)))
}

/// Decode the boolean returned by `transfer`.
///
/// Tokens that return nothing are treated as successful, matching the
/// behaviour of common token wrappers.
pub fn decode_transfer_ok(data: &[u8]) -> Result<bool, ChainError> {
    if data.is_empty() {
        return Ok(true);
    }
    ITip20::transferCall::abi_decode_returns(data)
        .map_err(|e| ChainError::Decode(format!("transfer(): {}", e)))
}
