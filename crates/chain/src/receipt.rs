//! Receipt polling.

use crate::client::{ChainClient, ChainError, Receipt};
use crate::config::ReceiptPolicy;
use alloy_primitives::TxHash;
use tokio::time::Instant;
use tracing::debug;

/// Poll until the receipt of `hash` is available or the policy times out.
///
/// Lookup errors while polling are treated like "not yet included": the
/// transaction already exists, so a flaky read must not turn into a verdict.
pub async fn wait_for_receipt<C>(
    client: &C,
    hash: TxHash,
    policy: &ReceiptPolicy,
) -> Result<Receipt, ChainError>
where
    C: ChainClient + ?Sized,
{
    let start = Instant::now();

    loop {
        match client.receipt(hash).await {
            Ok(Some(receipt)) => {
                debug!(
                    tx_hash = %hash,
                    success = receipt.success,
                    block = ?receipt.block_number,
                    waited_ms = start.elapsed().as_millis(),
                    "Receipt available"
                );
                return Ok(receipt);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(tx_hash = %hash, error = %e, "Receipt polling error");
            }
        }

        if start.elapsed() >= policy.timeout {
            return Err(ChainError::ReceiptTimeout {
                hash,
                waited: start.elapsed(),
            });
        }

        tokio::time::sleep(policy.poll_interval).await;
    }
}
