//! Optional requests-per-minute throttle using governor.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

// Single shared bucket per adapter
type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Waits for a free request slot before each upstream call.
///
/// An unset or zero RPM disables throttling.
#[derive(Clone, Default)]
pub struct Throttle {
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("enabled", &self.rpm_limiter.is_some())
            .finish()
    }
}

impl Throttle {
    /// Create a throttle for the given requests per minute.
    pub fn per_minute(rpm: Option<u32>) -> Self {
        let rpm_limiter = rpm.and_then(NonZeroU32::new).map(|n| {
            let quota = Quota::per_minute(n);
            Arc::new(GovernorRateLimiter::direct(quota))
        });
        Self { rpm_limiter }
    }

    /// Wait until a request is allowed.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }
    }
}
