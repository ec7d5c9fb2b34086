//! End-to-end generation tests over in-memory stores and mock providers.

mod test_utils;

use sitesmith_cache::MemoryStore;
use sitesmith_core::{
    GenerationRequest, LogLevel, NewProject, ProjectStatus, ProjectUpdate, ProviderId, RunStatus,
};
use sitesmith_error::ProviderErrorKind;
use sitesmith_interface::ProjectStore;
use sitesmith_pipeline::{InMemoryProjectStore, Orchestrator};
use sitesmith_rate_limit::{CallerRateLimiter, RateLimitSettings};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    FaultyStore, Faults, ManualClock, MockProvider, bakery_request, html_response, orchestrator,
    registry_of,
};
use uuid::Uuid;

fn setup(providers: &[Arc<MockProvider>]) -> (Orchestrator, InMemoryProjectStore) {
    let store = InMemoryProjectStore::new();
    let orchestrator = orchestrator(
        registry_of(providers),
        Arc::new(store.clone()),
        Arc::new(MemoryStore::default()),
    );
    (orchestrator, store)
}

/// Project attached to the most recent build log.
async fn last_project(store: &dyn ProjectStore) -> anyhow::Result<Option<sitesmith_core::Project>> {
    let logs = store.recent_build_logs(1).await?;
    let Some(project_id) = logs.first().and_then(|l| l.project_id) else {
        return Ok(None);
    };
    Ok(store.get_project(project_id).await?)
}

#[tokio::test]
async fn test_full_site_with_one_healthy_provider() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let (orchestrator, store) = setup(&[gemini.clone()]);

    let outcome = orchestrator.generate(bakery_request()).await?;

    assert!(!outcome.artifact.is_empty());
    assert!(outcome.total_tokens > 0);
    assert_eq!(outcome.steps.len(), 5);
    assert_eq!(gemini.call_count(), 5);

    let project = store.get_project(outcome.project_id).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Completed);
    assert_eq!(project.generated_code().as_deref(), Some(outcome.artifact.as_str()));
    assert_eq!(*project.total_tokens(), outcome.total_tokens);
    assert_eq!(project.provider().as_deref(), Some("gemini"));

    let log = store.get_build_log(&outcome.log_session_id).await?.unwrap();
    assert_eq!(log.status, RunStatus::Completed);
    assert_eq!(log.project_id, Some(outcome.project_id));
    assert_eq!(Some(log.id), outcome.log_record_id);
    assert!(log.entries.iter().any(|e| e.level == LogLevel::Success));
    assert!(orchestrator.live_log(&outcome.log_session_id).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_no_providers_fails_project() -> anyhow::Result<()> {
    let (orchestrator, store) = setup(&[]);

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "no_providers_available");
    let project = last_project(&store).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    assert!(project.generated_code().is_none());

    let log = store.recent_build_logs(1).await?.remove(0);
    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.entries.iter().any(|e| e.level == LogLevel::Error));
    Ok(())
}

#[tokio::test]
async fn test_failover_to_second_provider() -> anyhow::Result<()> {
    let claude = MockProvider::new_error(
        ProviderId::Claude,
        ProviderErrorKind::Api {
            status_code: 401,
            message: "invalid x-api-key".to_string(),
        },
    );
    let deepseek = MockProvider::new_success(ProviderId::DeepSeek, html_response("Bakery"));
    let (orchestrator, store) = setup(&[claude.clone(), deepseek.clone()]);

    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .description("bakery site")
        .provider("claude")
        .mode("section")
        .build()?;
    let outcome = orchestrator.generate(request).await?;

    assert!(outcome.steps.iter().all(|s| s.provider == ProviderId::DeepSeek));
    assert_eq!(claude.call_count(), 2);

    let log = store.get_build_log(&outcome.log_session_id).await?.unwrap();
    assert!(log.entries.iter().any(|e| {
        e.level == LogLevel::Warning
            && e.context.get("provider").and_then(|p| p.as_str()) == Some("claude")
            && e.message.contains("invalid x-api-key")
    }));
    Ok(())
}

#[tokio::test]
async fn test_targeted_step_runs_once() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Styled"));
    let (orchestrator, store) = setup(&[gemini.clone()]);

    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .description("bakery site")
        .mode("full_site")
        .step(3u8)
        .build()?;
    let outcome = orchestrator.generate(request).await?;

    assert_eq!(gemini.call_count(), 1);
    let records = store.list_step_records(outcome.project_id).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(*records[0].step(), 3);
    assert_eq!(outcome.artifact, outcome.steps[0].code);
    Ok(())
}

#[tokio::test]
async fn test_rejected_artifact_keeps_previous_code() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, "```html\n<p>hi</p>\n```");
    let (orchestrator, store) = setup(&[gemini]);

    let project_id = store
        .create_project(
            NewProject::builder()
                .owner_id("user-1")
                .description("bakery site")
                .build()?,
        )
        .await?;
    store
        .update_project(
            project_id,
            ProjectUpdate::default().with_generated_code("<main>old site</main>"),
        )
        .await?;

    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .project_id(project_id)
        .build()?;
    let err = orchestrator.generate(request).await.unwrap_err();

    assert_eq!(err.code(), "artifact_structurally_invalid");
    let project = store.get_project(project_id).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    assert_eq!(project.generated_code().as_deref(), Some("<main>old site</main>"));
    Ok(())
}

#[tokio::test]
async fn test_read_back_mismatch_fails_save() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let store = Arc::new(FaultyStore::new(Faults {
        corrupt_read_back: true,
        ..Faults::default()
    }));
    let orchestrator = orchestrator(
        registry_of(&[gemini]),
        store.clone(),
        Arc::new(MemoryStore::default()),
    );

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "save_verification_failed");
    let project = last_project(&store.inner).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_failed_code_write_fails_save() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let store = Arc::new(FaultyStore::new(Faults {
        fail_code_write: true,
        ..Faults::default()
    }));
    let orchestrator = orchestrator(
        registry_of(&[gemini]),
        store.clone(),
        Arc::new(MemoryStore::default()),
    );

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "save_verification_failed");
    let project = last_project(&store.inner).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    assert!(project.generated_code().is_none());
    Ok(())
}

#[tokio::test]
async fn test_step_record_failures_are_not_fatal() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let store = Arc::new(FaultyStore::new(Faults {
        fail_step_records: true,
        fail_build_log: true,
        ..Faults::default()
    }));
    let orchestrator = orchestrator(
        registry_of(&[gemini]),
        store.clone(),
        Arc::new(MemoryStore::default()),
    );

    let outcome = orchestrator.generate(bakery_request()).await?;

    assert!(outcome.log_record_id.is_none());
    assert!(store.inner.list_step_records(outcome.project_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failing_cleanup_writes_keep_the_primary_error() -> anyhow::Result<()> {
    let gemini = MockProvider::new_error(
        ProviderId::Gemini,
        ProviderErrorKind::Timeout("no answer after 60s".to_string()),
    );
    let store = Arc::new(FaultyStore::new(Faults {
        fail_status_updates: true,
        fail_build_log: true,
        ..Faults::default()
    }));
    let orchestrator = orchestrator(
        registry_of(&[gemini.clone()]),
        store.clone(),
        Arc::new(MemoryStore::default()),
    );

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "provider_failure");
    assert!(err.message().contains("timed out"));
    assert_eq!(gemini.call_count(), 1);
    assert_eq!(store.inner.project_count().await, 1);
    assert!(store.inner.recent_build_logs(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_panicking_provider_becomes_internal_fault() -> anyhow::Result<()> {
    let gemini = MockProvider::new_panic(ProviderId::Gemini, "adapter invariant broken");
    let (orchestrator, store) = setup(&[gemini.clone()]);

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "internal_fault");
    assert!(err.message().contains("adapter invariant broken"));
    let project = last_project(&store).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    assert!(project.generated_code().is_none());

    let log = store.recent_build_logs(1).await?.remove(0);
    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.summary.errors > 0);
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_caller_is_rejected_before_work() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let store = InMemoryProjectStore::new();
    let orchestrator = Orchestrator::new(
        registry_of(&[gemini.clone()]),
        Arc::new(store.clone()),
        Arc::new(MemoryStore::default()),
        CallerRateLimiter::new(RateLimitSettings {
            max_requests: 1,
            period_secs: 3600,
        }),
    )?;

    orchestrator.generate(bakery_request()).await?;
    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "rate_limited");
    assert_eq!(gemini.call_count(), 5);
    assert_eq!(store.project_count().await, 1);

    let other = GenerationRequest::builder()
        .caller_id("user-2")
        .description("florist site")
        .build()?;
    orchestrator.generate(other).await?;
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_window_resets() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let clock = Arc::new(ManualClock::new());
    let orchestrator = Orchestrator::new(
        registry_of(&[gemini]),
        Arc::new(InMemoryProjectStore::new()),
        Arc::new(MemoryStore::default()),
        CallerRateLimiter::with_clock(
            RateLimitSettings {
                max_requests: 1,
                period_secs: 60,
            },
            clock.clone(),
        ),
    )?;

    orchestrator.generate(bakery_request()).await?;
    let err = orchestrator.generate(bakery_request()).await.unwrap_err();
    assert_eq!(err.code(), "rate_limited");

    clock.advance(Duration::from_secs(61));
    orchestrator.generate(bakery_request()).await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_request_creates_nothing() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let (orchestrator, store) = setup(&[gemini.clone()]);

    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .description("   ")
        .build()?;
    let err = orchestrator.generate(request).await.unwrap_err();

    assert_eq!(err.code(), "invalid_request");
    assert_eq!(store.project_count().await, 0);
    assert_eq!(gemini.call_count(), 0);
    let log = store.recent_build_logs(1).await?.remove(0);
    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.project_id.is_none());
    Ok(())
}

#[tokio::test]
async fn test_foreign_project_is_rejected() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let (orchestrator, store) = setup(&[gemini]);
    let project_id = store
        .create_project(
            NewProject::builder()
                .owner_id("someone-else")
                .description("their site")
                .build()?,
        )
        .await?;

    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .project_id(project_id)
        .build()?;
    let err = orchestrator.generate(request).await.unwrap_err();
    assert_eq!(err.code(), "invalid_request");

    let missing = GenerationRequest::builder()
        .caller_id("user-1")
        .project_id(Uuid::new_v4())
        .build()?;
    let err = orchestrator.generate(missing).await.unwrap_err();
    assert_eq!(err.code(), "invalid_request");

    let project = store.get_project(project_id).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Draft);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_deadline_marks_project_failed() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let store = InMemoryProjectStore::new();
    let orchestrator = orchestrator(
        registry_of(&[gemini.clone()]),
        Arc::new(store.clone()),
        Arc::new(MemoryStore::default()),
    )
    .with_step_delay(Duration::from_secs(30))
    .with_timeout(Duration::from_secs(10));

    let err = orchestrator.generate(bakery_request()).await.unwrap_err();

    assert_eq!(err.code(), "timed_out");
    assert_eq!(gemini.call_count(), 1);
    let project = last_project(&store).await?.unwrap();
    assert_eq!(*project.status(), ProjectStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_unknown_mode_and_provider_fall_back() -> anyhow::Result<()> {
    let gemini = MockProvider::new_success(ProviderId::Gemini, html_response("Bakery"));
    let (orchestrator, store) = setup(&[gemini]);
    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .description("bakery site")
        .mode("hologram")
        .provider("mistral")
        .build()?;
    let outcome = orchestrator.generate(request).await?;

    assert_eq!(outcome.steps.len(), 5);
    let project = store.get_project(outcome.project_id).await?.unwrap();
    assert_eq!(project.mode(), "full_site");
    let log = store.get_build_log(&outcome.log_session_id).await?.unwrap();
    let warnings: Vec<&str> = log
        .entries
        .iter()
        .filter(|e| e.level == LogLevel::Warning)
        .map(|e| e.message.as_str())
        .collect();
    assert!(warnings.iter().any(|m| m.contains("Unknown mode")));
    assert!(warnings.iter().any(|m| m.contains("Unknown provider 'mistral'")));
    Ok(())
}
