//! Sequential step execution for one generation request.

use crate::{
    ArtifactCombiner, ArtifactExtractor, BuildLogger, BuildValidator, GenerationMode,
    PromptContext, ProviderRouter, Step, build_step_prompt,
};
use serde_json::json;
use sitesmith_cache::ResponseCache;
use sitesmith_core::{
    CompletionOptions, CompletionResult, GenerationRecord, ImageInput, ProviderId, RunStatus,
    StepOutcome, UsageRecord,
};
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};
use sitesmith_interface::ProjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Inputs of one pipeline run.
#[derive(Debug, Clone, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct PipelinePlan {
    /// Project the step records belong to
    project_id: Uuid,
    /// Caller billed for provider calls
    owner_id: String,
    /// Mode selecting the steps
    mode: GenerationMode,
    /// Provider tried first and used for cache keys
    preferred: ProviderId,
    /// Single step to run instead of the whole mode
    #[builder(default, setter(into, strip_option))]
    target_step: Option<u8>,
    /// Request details for prompt builders
    prompt_context: PromptContext,
    /// Artifact from an earlier call that seeds the prior context
    #[builder(default, setter(into, strip_option))]
    previous_context: Option<String>,
    /// Reference images forwarded to providers
    #[builder(default)]
    images: Vec<ImageInput>,
}

impl PipelinePlan {
    /// Creates a new plan builder.
    pub fn builder() -> PipelinePlanBuilder {
        PipelinePlanBuilder::default()
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Per-step results in execution order
    pub steps: Vec<StepOutcome>,
    /// Combined artifact
    pub artifact: String,
    /// Tokens across all steps
    pub total_tokens: u64,
    /// Cost across all steps
    pub total_cost: f64,
    /// Whether a single targeted step ran
    pub single_step: bool,
}

/// Steps a plan will execute and whether the list was collapsed to one.
pub fn select_steps(mode: GenerationMode, target: Option<u8>) -> (Vec<Step>, bool) {
    let steps = mode.steps();
    match target
        .and_then(Step::from_index)
        .filter(|step| steps.contains(step))
    {
        Some(step) => (vec![step], true),
        None => (steps.to_vec(), false),
    }
}

struct StepRun {
    result: CompletionResult,
    cached: bool,
    code: String,
}

fn millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Executes a mode's steps strictly in order.
///
/// Each step's extracted artifact becomes the prior context of the next.
/// The first fatal error ends the run; no partial artifact is returned.
pub struct PipelineRunner {
    router: ProviderRouter,
    store: Arc<dyn ProjectStore>,
    cache: Option<ResponseCache>,
    validator: BuildValidator,
    extractor: ArtifactExtractor,
    combiner: ArtifactCombiner,
    options: CompletionOptions,
    step_delay: Duration,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("router", &self.router)
            .field("cache", &self.cache.is_some())
            .field("step_delay", &self.step_delay)
            .finish()
    }
}

impl PipelineRunner {
    /// Create a runner without caching or inter-step delay.
    pub fn new(
        router: ProviderRouter,
        store: Arc<dyn ProjectStore>,
        options: CompletionOptions,
    ) -> GenerationResult<Self> {
        Ok(Self {
            router,
            store,
            cache: None,
            validator: BuildValidator::new()?,
            extractor: ArtifactExtractor::new()?,
            combiner: ArtifactCombiner::new()?,
            options,
            step_delay: Duration::ZERO,
        })
    }

    /// Memoize provider results in `cache`.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Pause between consecutive steps.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Options shared by every provider call.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// The router used for provider calls.
    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    /// Run the plan's steps.
    ///
    /// # Errors
    ///
    /// Returns the first fatal step error: provider exhaustion, an invalid
    /// response shape, or an empty extracted artifact.
    #[instrument(skip(self, plan, logger), fields(project_id = %plan.project_id, mode = %plan.mode))]
    pub async fn run(
        &self,
        plan: &PipelinePlan,
        logger: &BuildLogger,
    ) -> GenerationResult<PipelineOutput> {
        let (steps, single_step) = select_steps(plan.mode, plan.target_step);
        if let Some(target) = plan.target_step.filter(|_| !single_step) {
            logger
                .warning(
                    format!(
                        "Step {} is not part of mode {}, running all steps",
                        target, plan.mode
                    ),
                    json!({"step": target, "mode": plan.mode}),
                )
                .await;
        }
        logger
            .info(
                format!("Running {} step(s) for mode {}", steps.len(), plan.mode),
                json!({
                    "steps": steps.iter().map(|s| s.index()).collect::<Vec<_>>(),
                    "provider": plan.preferred,
                    "single_step": single_step,
                }),
            )
            .await;

        let mut prior_context = plan.previous_context.clone().unwrap_or_default();
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut artifacts = Vec::with_capacity(steps.len());
        let mut total_tokens = 0u64;
        let mut total_cost = 0.0f64;

        for (position, step) in steps.iter().copied().enumerate() {
            if position > 0 && !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
            logger.step_start(step, steps.len()).await;

            let started = Instant::now();
            let prompt = build_step_prompt(plan.mode, step, &plan.prompt_context, &prior_context);
            let run = match self.run_step(plan, step, &prompt, logger).await {
                Ok(run) => run,
                Err(e) => {
                    logger.step_failed(step, &e.message()).await;
                    self.save_failed_record(plan, step, &prompt, &e, millis(started))
                        .await;
                    return Err(e);
                }
            };
            let duration_ms = millis(started);
            let provider = (*run.result.provider()).unwrap_or(plan.preferred);

            self.save_step_record(plan, step, provider, &prompt, &run, duration_ms, logger)
                .await;
            if !run.cached {
                self.append_usage(plan, step, provider, &run.result, logger)
                    .await;
            }

            let tokens = run.result.total_tokens();
            let cost = *run.result.cost();
            total_tokens += tokens;
            total_cost += cost;
            logger
                .step_complete(step, provider, tokens, cost, run.cached, duration_ms)
                .await;

            prior_context = run.code.clone();
            artifacts.push(run.code.clone());
            outcomes.push(StepOutcome {
                step: step.index(),
                name: step.name().to_string(),
                provider,
                code: run.code,
                tokens,
                cost,
                cached: run.cached,
                duration_ms,
            });
        }

        let artifact = self.combiner.combine(&artifacts);
        debug!(steps = outcomes.len(), total_tokens, "Pipeline finished");
        Ok(PipelineOutput {
            steps: outcomes,
            artifact,
            total_tokens,
            total_cost,
            single_step,
        })
    }

    async fn run_step(
        &self,
        plan: &PipelinePlan,
        step: Step,
        prompt: &str,
        logger: &BuildLogger,
    ) -> GenerationResult<StepRun> {
        let (result, cached) = match self.cached_result(plan, step, prompt, logger).await {
            Some(result) => (result, true),
            None => (self.fresh_result(plan, step, prompt, logger).await?, false),
        };

        let extraction = self.extractor.extract(result.content());
        if extraction.is_fallback() {
            logger
                .warning(
                    format!("No code block found in step {} response, using raw text", step.index()),
                    json!({"step": step.index(), "chars": result.content().len()}),
                )
                .await;
        } else {
            logger
                .debug(
                    format!("Extracted step {} artifact", step.index()),
                    json!({"step": step.index(), "method": extraction.method.to_string()}),
                )
                .await;
        }

        if extraction.code.trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyStepOutput {
                step: step.index(),
                step_name: step.name().to_string(),
            }));
        }

        Ok(StepRun {
            result,
            cached,
            code: extraction.code,
        })
    }

    async fn cached_result(
        &self,
        plan: &PipelinePlan,
        step: Step,
        prompt: &str,
        logger: &BuildLogger,
    ) -> Option<CompletionResult> {
        let cache = self.cache.as_ref()?;
        let value = cache.get(plan.preferred, prompt, step.index()).await?;

        let report = self.validator.check_response(&value);
        let parsed = if report.valid {
            serde_json::from_value::<CompletionResult>(value).map_err(|e| e.to_string())
        } else {
            Err(report.summary())
        };
        match parsed {
            Ok(result) => {
                logger
                    .info(
                        format!("Cache hit for step {}", step.index()),
                        json!({"step": step.index(), "provider": plan.preferred}),
                    )
                    .await;
                Some(result)
            }
            Err(reason) => {
                logger
                    .warning(
                        format!("Discarding invalid cached response for step {}", step.index()),
                        json!({"step": step.index(), "error": reason}),
                    )
                    .await;
                cache.invalidate(plan.preferred, prompt, step.index()).await;
                None
            }
        }
    }

    async fn fresh_result(
        &self,
        plan: &PipelinePlan,
        step: Step,
        prompt: &str,
        logger: &BuildLogger,
    ) -> GenerationResult<CompletionResult> {
        let result = self
            .router
            .request_with_failover(Some(plan.preferred), prompt, &self.options, &plan.images, logger)
            .await?;

        let value = serde_json::to_value(&result).map_err(|e| {
            GenerationError::new(GenerationErrorKind::InternalFault(format!(
                "failed to encode provider result: {}",
                e
            )))
        })?;
        let report = self.validator.check_response(&value);
        if !report.valid {
            logger.validation(false, "response", &report.errors).await;
            return Err(GenerationError::new(
                GenerationErrorKind::ResponseShapeInvalid(
                    report
                        .first_error()
                        .unwrap_or("invalid response")
                        .to_string(),
                ),
            ));
        }

        if let Some(cache) = &self.cache {
            cache.put(plan.preferred, prompt, step.index(), value).await;
        }
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn save_step_record(
        &self,
        plan: &PipelinePlan,
        step: Step,
        provider: ProviderId,
        prompt: &str,
        run: &StepRun,
        duration_ms: u64,
        logger: &BuildLogger,
    ) {
        let record = GenerationRecord::builder()
            .project_id(plan.project_id)
            .step(step.index())
            .step_name(step.name())
            .provider(provider.to_string())
            .prompt(prompt)
            .response(run.result.content().as_str())
            .code(run.code.as_str())
            .prompt_tokens(*run.result.prompt_tokens())
            .completion_tokens(*run.result.completion_tokens())
            .cost(*run.result.cost())
            .duration_ms(duration_ms)
            .status(RunStatus::Completed)
            .build();

        let saved = match record {
            Ok(record) => self
                .store
                .save_step_record(record)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = saved {
            logger
                .warning(
                    format!("Failed to save record for step {}", step.index()),
                    json!({"step": step.index(), "error": e}),
                )
                .await;
        }
    }

    async fn save_failed_record(
        &self,
        plan: &PipelinePlan,
        step: Step,
        prompt: &str,
        error: &GenerationError,
        duration_ms: u64,
    ) {
        let provider = match &error.kind {
            GenerationErrorKind::ProviderFailure { provider, .. } => provider.clone(),
            _ => plan.preferred.to_string(),
        };
        let record = GenerationRecord::builder()
            .project_id(plan.project_id)
            .step(step.index())
            .step_name(step.name())
            .provider(provider)
            .prompt(prompt)
            .duration_ms(duration_ms)
            .status(RunStatus::Failed)
            .error(error.message())
            .build();

        let saved = match record {
            Ok(record) => self
                .store
                .save_step_record(record)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = saved {
            warn!(step = step.index(), error = %e, "Failed to save failed step record");
        }
    }

    async fn append_usage(
        &self,
        plan: &PipelinePlan,
        step: Step,
        provider: ProviderId,
        result: &CompletionResult,
        logger: &BuildLogger,
    ) {
        let record = UsageRecord::builder()
            .owner_id(plan.owner_id.as_str())
            .project_id(plan.project_id)
            .provider(provider.to_string())
            .operation(format!("generate_phase_{}", step.index()))
            .input_tokens(*result.prompt_tokens())
            .output_tokens(*result.completion_tokens())
            .cost(*result.cost())
            .build();

        let appended = match record {
            Ok(record) => self
                .store
                .append_usage(record)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = appended {
            logger
                .warning(
                    format!("Failed to track usage for step {}", step.index()),
                    json!({"step": step.index(), "error": e}),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_step_in_mode_collapses() {
        assert_eq!(
            select_steps(GenerationMode::FullSite, Some(3)),
            (vec![Step::Styling], true)
        );
    }

    #[test]
    fn test_target_step_outside_mode_runs_all() {
        let (steps, single) = select_steps(GenerationMode::Section, Some(5));
        assert_eq!(steps, vec![Step::Layout, Step::Styling]);
        assert!(!single);

        let (steps, single) = select_steps(GenerationMode::Layout, Some(0));
        assert_eq!(steps.len(), 4);
        assert!(!single);
    }
}
