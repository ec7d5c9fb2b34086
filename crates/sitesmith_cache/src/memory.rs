//! In-process ephemeral store with TTL expiry and LRU eviction.

use async_trait::async_trait;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sitesmith_error::StorageResult;
use sitesmith_interface::EphemeralStore;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Stored value with expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.created_at.elapsed())
    }
}

/// Configuration for [`MemoryStore`].
#[derive(
    Debug, Clone, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct MemoryStoreConfig {
    /// Maximum number of live entries before LRU eviction
    #[serde(default = "default_max_entries")]
    #[builder(default = "default_max_entries()")]
    max_entries: usize,
}

fn default_max_entries() -> usize {
    1000
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    access_order: VecDeque<String>,
}

impl Inner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

/// Concurrent in-memory [`EphemeralStore`].
///
/// All operations take a single async lock, so concurrent writers to the
/// same key serialize and the last write wins.
///
/// # Example
///
/// ```
/// use sitesmith_cache::MemoryStore;
/// use sitesmith_interface::EphemeralStore;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # tokio_test_block(async {
/// let store = MemoryStore::default();
/// store.set("k", json!({"content": "x"}), Duration::from_secs(60)).await.unwrap();
/// assert_eq!(store.get("k").await.unwrap(), Some(json!({"content": "x"})));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: MemoryStoreConfig,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create a new store with configuration.
    pub fn new(config: MemoryStoreConfig) -> Self {
        tracing::debug!(max_entries = config.max_entries, "Creating new MemoryStore");
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.forget(key);
        }
        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = inner.entries.len(),
                "Cleaned up expired entries"
            );
        }
        expired.len()
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len();
        inner.entries.clear();
        inner.access_order.clear();
        tracing::info!(cleared = count, "Cleared store");
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> StorageResult<Option<JsonValue>> {
        let mut inner = self.inner.lock().await;

        let Some(entry) = inner.entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            tracing::debug!("Entry expired, removing");
            inner.forget(key);
            return Ok(None);
        }

        let value = entry.value.clone();
        tracing::debug!(time_remaining = ?entry.time_remaining(), "Store hit");
        inner.touch(key);
        Ok(Some(value))
    }

    #[tracing::instrument(skip(self, value), fields(ttl_secs = ttl.as_secs()))]
    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> StorageResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.entries.len() >= self.config.max_entries && !inner.entries.contains_key(key) {
            inner.evict_lru();
        }

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        inner.touch(key);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.lock().await.forget(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryStore::default();
        store
            .set("a", json!(1), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction_keeps_recently_read() {
        let store = MemoryStore::new(MemoryStoreConfig::default().with_max_entries(2));
        let ttl = Duration::from_secs(60);
        store.set("a", json!("a"), ttl).await.unwrap();
        store.set("b", json!("b"), ttl).await.unwrap();

        // Reading "a" makes "b" the least recently used.
        store.get("a").await.unwrap();
        store.set("c", json!("c"), ttl).await.unwrap();

        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_same_key_last_writer_wins() {
        let store = MemoryStore::default();
        let ttl = Duration::from_secs(60);
        store.set("k", json!(1), ttl).await.unwrap();
        store.set("k", json!(2), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_counts_removed() {
        let store = MemoryStore::default();
        store.set("short", json!(1), Duration::from_secs(1)).await.unwrap();
        store.set("long", json!(2), Duration::from_secs(100)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = MemoryStore::default();
        store.set("k", json!(1), Duration::from_secs(60)).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
