//! Configuration and per-caller rate limiting for Sitesmith.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from sitesmith.toml)
//! - User overrides (~/.config/sitesmith/sitesmith.toml, then ./sitesmith.toml)
//!
//! [`CallerRateLimiter`] enforces the request cap per caller and period.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod limiter;

pub use config::{
    CacheSettings, DatabaseSettings, FailoverSettings, GenerationSettings, LoggingSettings,
    ProviderSettings, RateLimitSettings, SitesmithConfig,
};
pub use limiter::CallerRateLimiter;
