//! Exponential-backoff retry for rate-limited model calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{is_rate_limit_error, Result};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Run `op`, retrying on rate-limit errors with pure exponential backoff.
///
/// Attempt `n` (0-indexed) sleeps `base_delay * 2^n` before the next try,
/// so the defaults give 4 total calls and at most 2s + 4s + 8s of waiting.
/// Any error that does not look like a rate limit is returned immediately:
/// unknown failures are assumed non-transient, so the call fails fast
/// instead of stacking delays on top of a broken backend.
pub async fn with_retry<T, F, Fut>(mut op: F, max_retries: u32, base_delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..=max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_rate_limit_error(&e) || attempt == max_retries {
                    return Err(e);
                }
                let delay = base_delay * 2u32.pow(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    unreachable!("loop always returns")
}

/// [`with_retry`] with the default retry budget.
pub async fn with_default_retry<T, F, Fut>(op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(op, DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY).await
}
