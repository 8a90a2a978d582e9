//! Execution helpers: timeout wrapping and the retry loop
//!
//! Both helpers are policy-free wrappers around a pending operation; the
//! runners decide labels, attempt counts, and what counts as optional.

use crate::constants::MAX_RETRY_DELAY_MS;
use crate::error::{DeclFlowError, Result};
use crate::model::{Backoff, RetrySpec};
use std::future::Future;
use std::time::Duration;

/// Race an operation against a timer
///
/// On expiry the operation fails with `"<label>" timed out after <N>ms`.
/// The timer is dropped on normal completion; the underlying backend job is
/// not cancelled (backends that support cancellation expose `cancel`).
pub async fn with_timeout<T, F>(label: &str, timeout_ms: Option<u64>, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), operation).await {
            Ok(result) => result,
            Err(_) => Err(DeclFlowError::timeout(label, ms)),
        },
        None => operation.await,
    }
}

/// Compute the backoff sleep before retrying after `attempt` failed
///
/// Attempts are 1-based. Exponential backoff doubles per attempt and is
/// capped at [`MAX_RETRY_DELAY_MS`].
pub fn backoff_delay(spec: &RetrySpec, attempt: u32) -> u64 {
    let delay = match spec.backoff {
        Backoff::Fixed => spec.delay,
        Backoff::Exponential => {
            let shift = (attempt.saturating_sub(1)).min(63);
            spec.delay.saturating_mul(1u64 << shift)
        }
    };
    delay.min(MAX_RETRY_DELAY_MS)
}

/// Run an operation under a retry policy
///
/// `attempts` of 1 means no retry. The observer is told the attempt number
/// before each attempt. On exhaustion the last error is re-raised.
pub async fn retry_with_backoff<T, F, Fut, O>(
    spec: &RetrySpec,
    mut observer: O,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(u32),
{
    let attempts = spec.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        observer(attempt);

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::debug!(attempt, attempts, error = %e, "attempt failed");
                last_error = Some(e);

                if attempt < attempts {
                    let delay = backoff_delay(spec, attempt);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| DeclFlowError::backend("retry loop finished without an attempt")))
}
