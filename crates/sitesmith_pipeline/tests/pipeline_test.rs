//! Step execution tests against the pipeline runner.

mod test_utils;

use serde_json::json;
use sitesmith_cache::{MemoryStore, ResponseCache, ResponseCacheConfig};
use sitesmith_core::{CompletionOptions, GenerationRequest, ProviderId, RunStatus};
use sitesmith_interface::{EphemeralStore, ProjectStore};
use sitesmith_pipeline::{
    GenerationMode, InMemoryProjectStore, PipelinePlan, PipelineRunner, PromptContext,
    ProviderRouter, Step, build_step_prompt,
};
use std::sync::Arc;
use test_utils::{MockProvider, MockResponse, html_response, registry_of, scratch_logger};
use uuid::Uuid;

fn bakery_context() -> PromptContext {
    let request = GenerationRequest::builder()
        .caller_id("user-1")
        .description("bakery site")
        .build()
        .unwrap();
    PromptContext::from_request(&request)
}

fn plan(project_id: Uuid, mode: GenerationMode, target_step: Option<u8>) -> PipelinePlan {
    let mut plan = PipelinePlan::builder();
    plan.project_id(project_id)
        .owner_id("user-1")
        .mode(mode)
        .preferred(ProviderId::Gemini)
        .prompt_context(bakery_context());
    if let Some(step) = target_step {
        plan.target_step(step);
    }
    plan.build().unwrap()
}

fn runner(provider: Arc<MockProvider>, store: InMemoryProjectStore) -> PipelineRunner {
    PipelineRunner::new(
        ProviderRouter::new(Arc::new(registry_of(&[provider]))),
        Arc::new(store),
        CompletionOptions::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_steps_run_in_order_and_thread_prior_context() -> anyhow::Result<()> {
    let responses = (1..=5)
        .map(|i| MockResponse::Success(html_response(&format!("step-{i}-marker"))))
        .collect();
    let provider = MockProvider::new_sequence(ProviderId::Gemini, responses);
    let store = InMemoryProjectStore::new();
    let project_id = Uuid::new_v4();

    let output = runner(provider.clone(), store.clone())
        .run(&plan(project_id, GenerationMode::FullSite, None), &scratch_logger())
        .await?;

    let records = store.list_step_records(project_id).await?;
    let steps: Vec<u8> = records.iter().map(|r| *r.step()).collect();
    assert_eq!(steps, vec![1, 2, 3, 4, 5]);
    assert!(records.iter().all(|r| *r.status() == RunStatus::Completed));

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 5);
    assert!(!prompts[0].contains("Previous code to build upon"));
    for (i, prompt) in prompts.iter().enumerate().skip(1) {
        let expected = format!("Previous code to build upon:\n{}", output.steps[i - 1].code);
        assert!(prompt.ends_with(&expected), "step {} prompt lacks step {} artifact", i + 1, i);
        assert!(!prompt.contains(&format!("step-{}-marker", i + 1)));
    }

    assert!(!output.single_step);
    assert!(output.artifact.contains("step-5-marker"));
    assert_eq!(output.total_tokens, 5 * 150);
    assert_eq!(store.usage_records().await.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_mode_selects_step_subset() -> anyhow::Result<()> {
    let provider = MockProvider::new_success(ProviderId::Gemini, html_response("section"));
    let store = InMemoryProjectStore::new();
    let project_id = Uuid::new_v4();

    let output = runner(provider.clone(), store.clone())
        .run(&plan(project_id, GenerationMode::Section, None), &scratch_logger())
        .await?;

    let names: Vec<&str> = output.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["layout", "styling"]);
    assert!(provider.prompts()[0].starts_with("OUTPUT: Single reusable section code only."));
    Ok(())
}

#[tokio::test]
async fn test_target_step_runs_alone() -> anyhow::Result<()> {
    let provider = MockProvider::new_success(ProviderId::Gemini, html_response("styled"));
    let store = InMemoryProjectStore::new();
    let project_id = Uuid::new_v4();

    let output = runner(provider.clone(), store.clone())
        .run(&plan(project_id, GenerationMode::FullSite, Some(3)), &scratch_logger())
        .await?;

    assert!(output.single_step);
    assert_eq!(provider.call_count(), 1);
    assert!(provider.prompts()[0].contains("STYLING"));
    let records = store.list_step_records(project_id).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(*records[0].step(), 3);
    assert_eq!(output.artifact, output.steps[0].code);
    Ok(())
}

#[tokio::test]
async fn test_cache_hit_skips_provider_and_usage() -> anyhow::Result<()> {
    let provider = MockProvider::new_success(ProviderId::Gemini, html_response("cached"));
    let store = InMemoryProjectStore::new();
    let cache = ResponseCache::new(
        Arc::new(MemoryStore::default()),
        ResponseCacheConfig::default(),
    );
    let runner = runner(provider.clone(), store.clone()).with_cache(cache);
    let plan = plan(Uuid::new_v4(), GenerationMode::Section, None);

    let first = runner.run(&plan, &scratch_logger()).await?;
    assert_eq!(provider.call_count(), 2);
    assert!(first.steps.iter().all(|s| !s.cached));

    let second = runner.run(&plan, &scratch_logger()).await?;
    assert_eq!(provider.call_count(), 2);
    assert!(second.steps.iter().all(|s| s.cached));
    assert_eq!(second.artifact, first.artifact);
    assert_eq!(second.total_tokens, first.total_tokens);
    assert_eq!(store.usage_records().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_blank_step_output_stops_the_run() -> anyhow::Result<()> {
    let provider = MockProvider::new_sequence(
        ProviderId::Gemini,
        vec![
            MockResponse::Success(html_response("first")),
            MockResponse::Success("   ".to_string()),
            MockResponse::Success(html_response("never")),
        ],
    );
    let store = InMemoryProjectStore::new();
    let project_id = Uuid::new_v4();

    let err = runner(provider.clone(), store.clone())
        .run(&plan(project_id, GenerationMode::FullSite, None), &scratch_logger())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "empty_step_output");
    assert_eq!(provider.call_count(), 2);
    let records = store.list_step_records(project_id).await?;
    assert_eq!(records.len(), 2);
    assert_eq!(*records[1].status(), RunStatus::Failed);
    assert!(records[1].error().is_some());
    Ok(())
}

#[tokio::test]
async fn test_previous_context_seeds_first_step() -> anyhow::Result<()> {
    let provider = MockProvider::new_success(ProviderId::Gemini, html_response("resumed"));
    let earlier = "<section class=\"hero\"><h1>Earlier hero</h1></section>";
    let plan = PipelinePlan::builder()
        .project_id(Uuid::new_v4())
        .owner_id("user-1")
        .mode(GenerationMode::FullSite)
        .preferred(ProviderId::Gemini)
        .prompt_context(bakery_context())
        .target_step(4u8)
        .previous_context(earlier)
        .build()?;

    runner(provider.clone(), InMemoryProjectStore::new())
        .run(&plan, &scratch_logger())
        .await?;

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with(&format!("Previous code to build upon:\n{}", earlier)));
    Ok(())
}

#[tokio::test]
async fn test_invalid_cached_response_is_evicted_and_refetched() -> anyhow::Result<()> {
    let provider = MockProvider::new_success(ProviderId::Gemini, html_response("fresh"));
    let store = InMemoryProjectStore::new();
    let entries = Arc::new(MemoryStore::default());
    let cache = ResponseCache::new(entries.clone(), ResponseCacheConfig::default());

    let first_prompt =
        build_step_prompt(GenerationMode::Section, Step::Layout, &bakery_context(), "");
    let key = cache.key(ProviderId::Gemini, &first_prompt, Step::Layout.index());
    cache
        .put(
            ProviderId::Gemini,
            &first_prompt,
            Step::Layout.index(),
            json!({"error": {"message": "quota exceeded", "code": 429}}),
        )
        .await;

    let output = runner(provider.clone(), store.clone())
        .with_cache(cache)
        .run(&plan(Uuid::new_v4(), GenerationMode::Section, None), &scratch_logger())
        .await?;

    assert_eq!(provider.call_count(), 2);
    assert_eq!(provider.prompts()[0], first_prompt);
    assert!(!output.steps[0].cached);
    assert!(output.steps[0].code.contains("fresh"));

    let replaced = entries.get(&key).await?.unwrap();
    assert!(replaced.get("error").is_none());
    assert!(replaced["content"].as_str().unwrap().contains("fresh"));
    assert_eq!(store.usage_records().await.len(), 2);
    Ok(())
}
