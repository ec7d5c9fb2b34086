//! Retry with exponential backoff for transient provider failures.

use sitesmith_error::{ProviderError, ProviderResult, RetryableError};
use std::future::Future;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{info, warn};

/// Run `op`, retrying transient failures with the error's own backoff strategy.
///
/// The first attempt runs unconditionally. A permanent error is returned at
/// once; a retryable one selects `(initial_ms, retries, max_delay)` from
/// [`RetryableError::retry_strategy_params`], with `max_retries` overriding
/// the retry count when set. `Some(0)` disables retries entirely.
pub async fn with_retry<T, F, Fut>(max_retries: Option<usize>, mut op: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let first = match op().await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if !first.is_retryable() {
        warn!(error = %first, "Permanent provider error, failing immediately");
        return Err(first);
    }

    let (initial_ms, mut retries, max_delay_secs) = first.retry_strategy_params();
    if let Some(cap) = max_retries {
        retries = cap;
    }
    if retries == 0 {
        return Err(first);
    }

    info!(
        error = %first,
        initial_backoff_ms = initial_ms,
        max_retries = retries,
        max_delay_secs,
        "Provider request failed, will retry with configured strategy"
    );

    let strategy = ExponentialBackoff::from_millis(initial_ms)
        .factor(2)
        .max_delay(Duration::from_secs(max_delay_secs))
        .map(jitter)
        .take(retries);

    Retry::spawn(strategy, || {
        let attempt = op();
        async move {
            attempt.await.map_err(|e: ProviderError| {
                if e.is_retryable() {
                    warn!(error = %e, "Provider request failed, will retry");
                    RetryError::Transient {
                        err: e,
                        retry_after: None,
                    }
                } else {
                    warn!(error = %e, "Permanent provider error, failing immediately");
                    RetryError::Permanent(e)
                }
            })
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_error::ProviderErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn api(status_code: u16) -> ProviderError {
        ProviderError::new(ProviderErrorKind::Api {
            status_code,
            message: "boom".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = with_retry(None, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(api(503))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = with_retry(None, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(api(401)) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind.code(), "http_401");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cap_override_limits_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = with_retry(Some(1), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(api(500)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_returns_first_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = with_retry(Some(0), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(api(503)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
