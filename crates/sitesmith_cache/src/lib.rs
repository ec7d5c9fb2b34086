//! Short-lived keyed storage and provider response caching.
//!
//! [`MemoryStore`] is an in-process [`EphemeralStore`](sitesmith_interface::EphemeralStore)
//! with TTL expiry and LRU eviction. [`ResponseCache`] memoizes provider
//! results on top of any ephemeral store so identical prompts are not billed twice.

#![warn(missing_docs)]

mod memory;
mod response;

pub use memory::{CacheEntry, MemoryStore, MemoryStoreConfig, MemoryStoreConfigBuilder};
pub use response::{ResponseCache, ResponseCacheConfig, ResponseCacheConfigBuilder};
