//! Test utilities for pipeline tests.
//!
//! Mock providers, fault-injecting stores and request fixtures.

#![allow(dead_code)]

pub mod faulty_store;
pub mod manual_clock;
pub mod mock_provider;

#[allow(unused_imports)]
pub use faulty_store::{FaultyStore, Faults};
#[allow(unused_imports)]
pub use manual_clock::ManualClock;
#[allow(unused_imports)]
pub use mock_provider::{MockBehavior, MockProvider, MockResponse};

use sitesmith_cache::MemoryStore;
use sitesmith_core::{GenerationRequest, ProviderId};
use sitesmith_interface::{EphemeralStore, ProjectStore};
use sitesmith_pipeline::{BuildLogger, LiveViewSettings, Orchestrator, ProviderRegistry};
use sitesmith_rate_limit::{CallerRateLimiter, RateLimitSettings};
use std::sync::Arc;

/// A fenced HTML document long enough to pass the structural check.
pub fn html_response(marker: &str) -> String {
    format!(
        "Here is the page:\n```html\n<!DOCTYPE html>\n<html><head><title>{0}</title></head><body><main><h1>{0}</h1><p>Fresh bread baked every morning.</p></main></body></html>\n```",
        marker
    )
}

/// Registry over the given mocks with the default failover order.
pub fn registry_of(providers: &[Arc<MockProvider>]) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(ProviderId::priority_order().to_vec());
    for provider in providers {
        registry.register(provider.clone());
    }
    registry
}

/// Logger writing to throwaway stores.
pub fn scratch_logger() -> BuildLogger {
    BuildLogger::new(
        Arc::new(MemoryStore::default()),
        Arc::new(sitesmith_pipeline::InMemoryProjectStore::new()),
        LiveViewSettings::default(),
    )
}

/// Orchestrator over in-memory stores with a generous rate limit.
pub fn orchestrator(
    registry: ProviderRegistry,
    store: Arc<dyn ProjectStore>,
    live: Arc<dyn EphemeralStore>,
) -> Orchestrator {
    Orchestrator::new(
        registry,
        store,
        live,
        CallerRateLimiter::new(RateLimitSettings::default()),
    )
    .expect("orchestrator should build")
}

/// Full-site request for a bakery.
pub fn bakery_request() -> GenerationRequest {
    GenerationRequest::builder()
        .caller_id("user-1")
        .description("bakery site")
        .mode("full_site")
        .build()
        .expect("request should build")
}
