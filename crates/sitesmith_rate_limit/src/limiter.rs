//! Per-caller request cap using governor's keyed GCRA limiter.
//!
//! The cap is modelled as a burst of `max_requests` that replenishes one
//! request every `period / max_requests`, so a caller that spends its whole
//! allowance regains it once a full period has passed.

use crate::RateLimitSettings;
use governor::clock::Clock as GovernorClock;
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};
use sitesmith_interface::{Clock, SystemClock};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Callers tracked before stale entries are swept on the next check.
const SWEEP_THRESHOLD: usize = 1024;

/// Adapts the injected [`Clock`] to governor's clock trait.
#[derive(Clone)]
struct InjectedClock(Arc<dyn Clock>);

impl GovernorClock for InjectedClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        self.0.now()
    }
}

type KeyedLimiter = GovernorRateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    InjectedClock,
    NoOpMiddleware<Instant>,
>;

/// Request cap per caller identity and period.
///
/// A `max_requests` or `period_secs` of zero disables limiting.
pub struct CallerRateLimiter {
    settings: RateLimitSettings,
    clock: InjectedClock,
    limiter: Option<KeyedLimiter>,
}

impl std::fmt::Debug for CallerRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerRateLimiter")
            .field("settings", &self.settings)
            .field("tracked_callers", &self.tracked_callers())
            .finish()
    }
}

impl CallerRateLimiter {
    /// Create a limiter on the system clock.
    pub fn new(settings: RateLimitSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a limiter on an injected clock.
    pub fn with_clock(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        let clock = InjectedClock(clock);
        let limiter = quota(&settings)
            .map(|quota| GovernorRateLimiter::dashmap_with_clock(quota, clock.clone()));
        Self {
            settings,
            clock,
            limiter,
        }
    }

    /// Admit one request for `caller` or fail with `RateLimited`.
    #[instrument(skip(self), fields(limit = self.settings.max_requests))]
    pub fn check(&self, caller: &str) -> GenerationResult<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        if limiter.len() >= SWEEP_THRESHOLD {
            self.prune();
        }

        match limiter.check_key(&caller.to_string()) {
            Ok(()) => {
                debug!("Request admitted");
                Ok(())
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                warn!(retry_after_secs, "Rate limit exceeded");
                Err(GenerationError::new(GenerationErrorKind::RateLimited {
                    caller: caller.to_string(),
                    limit: self.settings.max_requests,
                    period_secs: self.settings.period_secs,
                    retry_after_secs,
                }))
            }
        }
    }

    /// Drop callers whose allowance has fully replenished.
    pub fn prune(&self) {
        if let Some(limiter) = &self.limiter {
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(before, after = limiter.len(), "Pruned idle callers");
        }
    }

    /// Callers currently holding limiter state.
    pub fn tracked_callers(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

fn quota(settings: &RateLimitSettings) -> Option<Quota> {
    let burst = NonZeroU32::new(settings.max_requests)?;
    if settings.period_secs == 0 {
        return None;
    }
    let replenish = (Duration::from_secs(settings.period_secs) / burst.get())
        .max(Duration::from_nanos(1));
    Quota::with_period(replenish).map(|quota| quota.allow_burst(burst))
}
