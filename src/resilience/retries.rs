//! Retry logic.
//!
//! Only errors that report themselves as retryable (transport failures,
//! timeouts) are retried. Rebroadcasting a signed transaction is safe: it
//! carries the same hash and nonce every time.

use std::future::Future;

use tokio::time::sleep;

use crate::blockchain::types::SdkResult;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::policy_backoff;

/// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryConfig, operation: &str, mut op: F) -> SdkResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SdkResult<T>>,
{
    let max_attempts = if policy.enabled { policy.max_attempts.max(1) } else { 1 };
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy_backoff(policy, attempt);
                tracing::warn!(
                    operation = operation,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failure"
                );
                metrics::record_retry(operation);
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
