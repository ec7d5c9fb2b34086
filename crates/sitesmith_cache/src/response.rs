//! Provider response memoization keyed by (provider, prompt prefix, step).

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use sitesmith_core::ProviderId;
use sitesmith_interface::EphemeralStore;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "ai_cache:";

/// Configuration for [`ResponseCache`].
#[derive(
    Debug, Clone, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct ResponseCacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    #[builder(default = "default_ttl_secs()")]
    ttl_secs: u64,

    /// Prompt characters folded into the key (0 = whole prompt)
    #[serde(default = "default_prompt_prefix_chars")]
    #[builder(default = "default_prompt_prefix_chars()")]
    prompt_prefix_chars: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_prompt_prefix_chars() -> usize {
    200
}

fn default_enabled() -> bool {
    true
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            prompt_prefix_chars: default_prompt_prefix_chars(),
            enabled: default_enabled(),
        }
    }
}

/// Memoizes raw provider results in an [`EphemeralStore`].
///
/// Entries are not tied to a project: every request whose key matches shares
/// the entry. Store failures degrade to cache misses and are only logged.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn EphemeralStore>,
    config: ResponseCacheConfig,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Create a cache over the given store.
    pub fn new(store: Arc<dyn EphemeralStore>, config: ResponseCacheConfig) -> Self {
        tracing::debug!(
            ttl_secs = config.ttl_secs,
            prompt_prefix_chars = config.prompt_prefix_chars,
            enabled = config.enabled,
            "Creating new ResponseCache"
        );
        Self { store, config }
    }

    /// Cache configuration.
    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    /// Derive the store key for a provider call.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitesmith_cache::{ResponseCache, ResponseCacheConfig};
    /// use sitesmith_core::ProviderId;
    ///
    /// let config = ResponseCacheConfig::default();
    /// let a = ResponseCache::key_for(&config, ProviderId::DeepSeek, "Build a bakery site", 1);
    /// let b = ResponseCache::key_for(&config, ProviderId::DeepSeek, "Build a bakery site", 2);
    /// assert_ne!(a, b);
    /// assert!(a.starts_with("ai_cache:"));
    /// ```
    pub fn key_for(
        config: &ResponseCacheConfig,
        provider: ProviderId,
        prompt: &str,
        step: u8,
    ) -> String {
        let prefix: String = if config.prompt_prefix_chars == 0 {
            prompt.to_string()
        } else {
            prompt.chars().take(config.prompt_prefix_chars).collect()
        };

        let mut hasher = Sha256::new();
        hasher.update(provider.as_ref().as_bytes());
        hasher.update([0u8]);
        hasher.update(prefix.as_bytes());
        hasher.update([0u8]);
        hasher.update([step]);
        format!("{}{:x}", KEY_PREFIX, hasher.finalize())
    }

    /// Store key for a provider call under this cache's configuration.
    pub fn key(&self, provider: ProviderId, prompt: &str, step: u8) -> String {
        Self::key_for(&self.config, provider, prompt, step)
    }

    /// Look up a cached result.
    #[tracing::instrument(skip(self, prompt), fields(provider = %provider, step))]
    pub async fn get(&self, provider: ProviderId, prompt: &str, step: u8) -> Option<JsonValue> {
        if !self.config.enabled {
            return None;
        }
        let key = self.key(provider, prompt, step);
        match self.store.get(&key).await {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a result for later identical calls.
    #[tracing::instrument(skip(self, prompt, value), fields(provider = %provider, step))]
    pub async fn put(&self, provider: ProviderId, prompt: &str, step: u8, value: JsonValue) {
        if !self.config.enabled {
            return;
        }
        let key = self.key(provider, prompt, step);
        let ttl = Duration::from_secs(self.config.ttl_secs);
        if let Err(e) = self.store.set(&key, value, ttl).await {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        }
    }

    /// Drop a cached result.
    pub async fn invalidate(&self, provider: ProviderId, prompt: &str, step: u8) {
        let key = self.key(provider, prompt, step);
        if let Err(e) = self.store.delete(&key).await {
            tracing::warn!(error = %e, key = %key, "Cache delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryStore::default()), ResponseCacheConfig::default())
    }

    #[test]
    fn test_key_depends_on_provider_and_step() {
        let config = ResponseCacheConfig::default();
        let base = ResponseCache::key_for(&config, ProviderId::DeepSeek, "prompt", 1);
        assert_ne!(base, ResponseCache::key_for(&config, ProviderId::Gemini, "prompt", 1));
        assert_ne!(base, ResponseCache::key_for(&config, ProviderId::DeepSeek, "prompt", 2));
        assert_eq!(base, ResponseCache::key_for(&config, ProviderId::DeepSeek, "prompt", 1));
    }

    #[test]
    fn test_key_only_uses_prompt_prefix() {
        let config = ResponseCacheConfig::default().with_prompt_prefix_chars(5);
        let a = ResponseCache::key_for(&config, ProviderId::OpenAi, "hello world", 1);
        let b = ResponseCache::key_for(&config, ProviderId::OpenAi, "hello there", 1);
        assert_eq!(a, b);

        let whole = ResponseCacheConfig::default().with_prompt_prefix_chars(0);
        let a = ResponseCache::key_for(&whole, ProviderId::OpenAi, "hello world", 1);
        let b = ResponseCache::key_for(&whole, ProviderId::OpenAi, "hello there", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_prefix_counts_characters_not_bytes() {
        let config = ResponseCacheConfig::default().with_prompt_prefix_chars(2);
        let a = ResponseCache::key_for(&config, ProviderId::Claude, "éé-one", 3);
        let b = ResponseCache::key_for(&config, ProviderId::Claude, "éé-two", 3);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let cache = cache();
        assert!(cache.get(ProviderId::DeepSeek, "p", 1).await.is_none());
        cache
            .put(ProviderId::DeepSeek, "p", 1, json!({"content": "<div></div>"}))
            .await;
        assert_eq!(
            cache.get(ProviderId::DeepSeek, "p", 1).await,
            Some(json!({"content": "<div></div>"}))
        );
        cache.invalidate(ProviderId::DeepSeek, "p", 1).await;
        assert!(cache.get(ProviderId::DeepSeek, "p", 1).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = ResponseCache::new(
            Arc::new(MemoryStore::default()),
            ResponseCacheConfig::default().with_enabled(false),
        );
        cache.put(ProviderId::DeepSeek, "p", 1, json!({"content": "x"})).await;
        assert!(cache.get(ProviderId::DeepSeek, "p", 1).await.is_none());
    }
}
