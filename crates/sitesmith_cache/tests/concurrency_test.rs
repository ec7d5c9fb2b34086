//! Concurrent access to the shared response cache.

use serde_json::json;
use sitesmith_cache::{MemoryStore, ResponseCache, ResponseCacheConfig};
use sitesmith_core::ProviderId;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_leave_a_readable_entry() -> anyhow::Result<()> {
    let cache = ResponseCache::new(
        Arc::new(MemoryStore::default()),
        ResponseCacheConfig::default(),
    );

    let mut handles = Vec::new();
    for i in 0..32u64 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache
                .put(
                    ProviderId::DeepSeek,
                    "shared prompt",
                    1,
                    json!({"content": format!("<div>{}</div>", i), "prompt_tokens": i}),
                )
                .await;
            cache.get(ProviderId::DeepSeek, "shared prompt", 1).await
        }));
    }

    for handle in handles {
        let seen = handle.await?;
        assert!(seen.is_some(), "a reader after its own write must see some entry");
    }

    let value = cache
        .get(ProviderId::DeepSeek, "shared prompt", 1)
        .await
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    let content = value["content"].as_str().unwrap_or_default();
    assert!(content.starts_with("<div>") && content.ends_with("</div>"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_do_not_interfere() -> anyhow::Result<()> {
    let cache = ResponseCache::new(
        Arc::new(MemoryStore::default()),
        ResponseCacheConfig::default(),
    );

    let mut handles = Vec::new();
    for step in 1..=5u8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache
                .put(ProviderId::Gemini, "prompt", step, json!({"content": step}))
                .await;
        }));
    }
    for handle in handles {
        handle.await?;
    }

    for step in 1..=5u8 {
        let value = cache.get(ProviderId::Gemini, "prompt", step).await;
        assert_eq!(value, Some(json!({"content": step})));
    }
    Ok(())
}
