//! Top-level generation coordinator.
//!
//! [`Orchestrator::generate`] owns the project lifecycle: it validates the
//! request, moves the project to `generating`, runs the pipeline, checks and
//! saves the artifact, reads it back, and only then marks the project
//! `completed`. Any failure marks it `failed` and closes the build log.

use crate::{
    BuildLogger, BuildValidator, GenerationMode, LiveViewSettings, PipelineOutput, PipelinePlan,
    PipelineRunner, PromptContext, ProviderRegistry, ProviderRouter,
};
use futures::FutureExt;
use serde_json::json;
use sitesmith_cache::ResponseCache;
use sitesmith_core::{
    CompletionOptions, GenerationOutcome, GenerationRequest, LogEntry, NewProject, Project,
    ProjectStatus, ProjectUpdate, ProviderId, RunStatus,
};
use sitesmith_error::{GenerationError, GenerationErrorKind, GenerationResult};
use sitesmith_interface::{EphemeralStore, ProjectStore};
use sitesmith_rate_limit::CallerRateLimiter;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Default whole-run deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Best-effort writes run after a failed attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CleanupAction {
    /// Set the project status to `failed`
    MarkProjectFailed,
    /// Record the primary error in the build log
    LogError,
    /// Write the durable build log as failed
    FinalizeLog,
}

/// Cleanup sequence applied to every failed attempt.
pub const FAILURE_CLEANUP: [CleanupAction; 3] = [
    CleanupAction::MarkProjectFailed,
    CleanupAction::LogError,
    CleanupAction::FinalizeLog,
];

#[track_caller]
fn internal(context: &str, detail: impl std::fmt::Display) -> GenerationError {
    GenerationError::new(GenerationErrorKind::InternalFault(format!(
        "{}: {}",
        context, detail
    )))
}

#[track_caller]
fn save_failed(detail: impl Into<String>) -> GenerationError {
    GenerationError::new(GenerationErrorKind::SaveVerificationFailed(detail.into()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Coordinates one generation request end to end.
///
/// # Example
///
/// ```no_run
/// use sitesmith_cache::MemoryStore;
/// use sitesmith_core::{GenerationRequest, ProviderId};
/// use sitesmith_pipeline::{InMemoryProjectStore, Orchestrator, ProviderRegistry};
/// use sitesmith_rate_limit::{CallerRateLimiter, RateLimitSettings};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = ProviderRegistry::new(ProviderId::priority_order().to_vec());
/// let orchestrator = Orchestrator::new(
///     registry,
///     Arc::new(InMemoryProjectStore::new()),
///     Arc::new(MemoryStore::default()),
///     CallerRateLimiter::new(RateLimitSettings::default()),
/// )?;
///
/// let request = GenerationRequest::builder()
///     .caller_id("user-1")
///     .description("bakery site")
///     .build()?;
/// match orchestrator.generate(request).await {
///     Ok(outcome) => println!("{}", outcome.artifact),
///     Err(e) => eprintln!("{}: {}", e.code(), e.message()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    runner: PipelineRunner,
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ProjectStore>,
    live: Arc<dyn EphemeralStore>,
    limiter: CallerRateLimiter,
    validator: BuildValidator,
    live_view: LiveViewSettings,
    timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("runner", &self.runner)
            .field("limiter", &self.limiter)
            .field("live_view", &self.live_view)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    ///
    /// Caching is off and steps run back to back until configured otherwise.
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn ProjectStore>,
        live: Arc<dyn EphemeralStore>,
        limiter: CallerRateLimiter,
    ) -> GenerationResult<Self> {
        let registry = Arc::new(registry);
        let runner = PipelineRunner::new(
            ProviderRouter::new(registry.clone()),
            store.clone(),
            CompletionOptions::default(),
        )?;
        Ok(Self {
            runner,
            registry,
            store,
            live,
            limiter,
            validator: BuildValidator::new()?,
            live_view: LiveViewSettings::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Memoize provider results.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.runner = self.runner.with_cache(cache);
        self
    }

    /// Options passed to every provider call.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.runner = self.runner.with_options(options);
        self
    }

    /// Pause between consecutive steps.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.runner = self.runner.with_step_delay(delay);
        self
    }

    /// Whole-run deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bounds of the live log view.
    pub fn with_live_view(mut self, settings: LiveViewSettings) -> Self {
        self.live_view = settings;
        self
    }

    /// Configured providers.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Durable store.
    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    /// Live log entries of an in-flight session.
    ///
    /// Returns nothing once the session is finalized or its view expired.
    pub async fn live_log(&self, session_id: &str) -> Vec<LogEntry> {
        BuildLogger::live_log(self.live.as_ref(), session_id).await
    }

    /// Run one generation request.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] whose `code()` identifies the failure.
    /// The project, if one was opened, is left `failed` and the build log is
    /// finalized before the error is returned.
    #[instrument(skip(self, request), fields(caller = %request.caller_id(), project_id = ?request.project_id()))]
    pub async fn generate(&self, request: GenerationRequest) -> GenerationResult<GenerationOutcome> {
        let logger = BuildLogger::new(self.live.clone(), self.store.clone(), self.live_view);
        logger
            .info(
                "Generation started",
                json!({
                    "caller": request.caller_id(),
                    "mode": request.mode(),
                    "provider": request.provider(),
                    "step": request.step(),
                }),
            )
            .await;

        let attempt = AssertUnwindSafe(self.run(&request, &logger)).catch_unwind();
        let result = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => {
                let message = panic_message(payload);
                error!(session_id = %logger.session_id(), panic = %message, "Generation panicked");
                Err(internal("unexpected panic", message))
            }
            Err(_) => Err(GenerationError::new(GenerationErrorKind::TimedOut(
                self.timeout.as_secs(),
            ))),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.clean_up(&logger, &e).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        logger: &BuildLogger,
    ) -> GenerationResult<GenerationOutcome> {
        Self::validate_request(request)?;
        self.limiter.check(request.caller_id())?;

        let (mode, fell_back) = GenerationMode::resolve(request.mode().as_deref());
        let project = self.open_project(request, mode, logger).await?;
        if fell_back {
            logger
                .warning(
                    format!("Unknown mode, using {}", mode),
                    json!({"requested": request.mode(), "mode": mode}),
                )
                .await;
        }

        let choice = self
            .registry
            .resolve_preferred(request.provider().as_deref())?;
        if let Some(reason) = &choice.fallback_reason {
            logger
                .warning(
                    format!("{}; using {}", reason, choice.provider),
                    json!({"requested": request.provider(), "provider": choice.provider}),
                )
                .await;
        }

        let mut plan = PipelinePlan::builder();
        plan.project_id(*project.id())
            .owner_id(request.caller_id().as_str())
            .mode(mode)
            .preferred(choice.provider)
            .prompt_context(PromptContext::from_request(request).backfill(&project))
            .images(request.images().clone());
        if let Some(step) = *request.step() {
            plan.target_step(step);
        }
        if let Some(previous) = request.previous_context() {
            plan.previous_context(previous.as_str());
        }
        let plan = plan.build().map_err(|e| internal("invalid pipeline plan", e))?;

        let output = self.runner.run(&plan, logger).await?;
        self.validate_artifact(&output, mode, logger).await?;

        let provider = output
            .steps
            .last()
            .map(|s| s.provider)
            .unwrap_or(choice.provider);
        self.save_and_verify(&project, &output, provider, logger)
            .await?;

        self.store
            .update_project(*project.id(), ProjectUpdate::status(ProjectStatus::Completed))
            .await
            .map_err(|e| internal("failed to mark project completed", e))?;
        logger
            .success(
                "Generation completed",
                json!({
                    "project_id": project.id(),
                    "steps": output.steps.len(),
                    "total_tokens": output.total_tokens,
                    "total_cost": output.total_cost,
                }),
            )
            .await;
        let log_record_id = logger.finalize(RunStatus::Completed).await;
        info!(project_id = %project.id(), total_tokens = output.total_tokens, "Generation completed");

        Ok(GenerationOutcome {
            project_id: *project.id(),
            artifact: output.artifact,
            total_tokens: output.total_tokens,
            total_cost: output.total_cost,
            log_session_id: logger.session_id().to_string(),
            log_record_id,
            steps: output.steps,
        })
    }

    fn validate_request(request: &GenerationRequest) -> GenerationResult<()> {
        if request.caller_id().trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::InvalidRequest(
                "A caller id is required".to_string(),
            )));
        }
        if request.project_id().is_none() && request.description().trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::InvalidRequest(
                "A description or an existing project id is required".to_string(),
            )));
        }
        if request.step().is_some_and(|s| s == 0) {
            return Err(GenerationError::new(GenerationErrorKind::InvalidRequest(
                "Step numbers start at 1".to_string(),
            )));
        }
        Ok(())
    }

    /// Create or load the project and move it to `generating`.
    async fn open_project(
        &self,
        request: &GenerationRequest,
        mode: GenerationMode,
        logger: &BuildLogger,
    ) -> GenerationResult<Project> {
        let id = match *request.project_id() {
            Some(id) => {
                let existing = self
                    .store
                    .get_project(id)
                    .await
                    .map_err(|e| internal("failed to load project", e))?
                    .ok_or_else(|| {
                        GenerationError::new(GenerationErrorKind::InvalidRequest(format!(
                            "Project {} does not exist",
                            id
                        )))
                    })?;
                if existing.owner_id() != request.caller_id() {
                    return Err(GenerationError::new(GenerationErrorKind::InvalidRequest(
                        format!("Project {} belongs to another caller", id),
                    )));
                }
                logger.set_project(id);
                self.store
                    .update_project(
                        id,
                        ProjectUpdate::status(ProjectStatus::Generating).with_mode(mode.to_string()),
                    )
                    .await
                    .map_err(|e| internal("failed to update project", e))?;
                id
            }
            None => {
                let mut new = NewProject::builder();
                new.owner_id(request.caller_id().as_str())
                    .name(request.name().as_str())
                    .description(request.description().as_str())
                    .website_type(request.website_type().as_str())
                    .settings(request.settings().clone())
                    .mode(mode.to_string())
                    .status(ProjectStatus::Generating);
                if let Some(industry) = request.industry() {
                    new.industry(industry.as_str());
                }
                if let Some(provider) = request.provider() {
                    new.provider(provider.as_str());
                }
                let new = new.build().map_err(|e| internal("invalid project", e))?;
                let id = self
                    .store
                    .create_project(new)
                    .await
                    .map_err(|e| internal("failed to create project", e))?;
                logger.set_project(id);
                id
            }
        };

        let project = self
            .store
            .get_project(id)
            .await
            .map_err(|e| internal("failed to load project", e))?
            .ok_or_else(|| internal("project vanished", id))?;
        logger
            .info(
                format!("Project {} is generating", id),
                json!({"project_id": id, "mode": mode}),
            )
            .await;
        Ok(project)
    }

    async fn validate_artifact(
        &self,
        output: &PipelineOutput,
        mode: GenerationMode,
        logger: &BuildLogger,
    ) -> GenerationResult<()> {
        if output.single_step {
            let passed = !output.artifact.trim().is_empty();
            let errors = if passed {
                Vec::new()
            } else {
                vec!["Generated code is empty".to_string()]
            };
            logger.validation(passed, "non_empty", &errors).await;
            return if passed {
                Ok(())
            } else {
                Err(GenerationError::new(
                    GenerationErrorKind::ArtifactStructurallyInvalid(errors.join("; ")),
                ))
            };
        }

        let kind = mode.artifact_kind();
        let report = self.validator.check_code(&output.artifact, kind);
        logger
            .validation(report.valid, &kind.to_string(), &report.errors)
            .await;
        if report.valid {
            Ok(())
        } else {
            Err(GenerationError::new(
                GenerationErrorKind::ArtifactStructurallyInvalid(
                    report.first_error().unwrap_or("invalid artifact").to_string(),
                ),
            ))
        }
    }

    /// Write the artifact and confirm it reads back unchanged.
    async fn save_and_verify(
        &self,
        project: &Project,
        output: &PipelineOutput,
        provider: ProviderId,
        logger: &BuildLogger,
    ) -> GenerationResult<()> {
        let id = *project.id();
        let report = self.validator.check_save(id, &output.artifact);
        if !report.valid {
            logger.validation(false, "save", &report.errors).await;
            return Err(save_failed(report.first_error().unwrap_or("invalid save")));
        }

        let update = ProjectUpdate::default()
            .with_generated_code(output.artifact.clone())
            .with_provider(provider.to_string())
            .with_total_tokens(project.total_tokens() + output.total_tokens)
            .with_total_cost(project.total_cost() + output.total_cost);
        self.store
            .update_project(id, update)
            .await
            .map_err(|e| save_failed(format!("write failed: {}", e)))?;

        let stored = self
            .store
            .get_project(id)
            .await
            .map_err(|e| save_failed(format!("read-back failed: {}", e)))?
            .ok_or_else(|| save_failed("project missing on read-back"))?;
        if stored.generated_code().as_deref() != Some(output.artifact.as_str()) {
            logger
                .validation(
                    false,
                    "save",
                    &["Stored artifact does not match what was written".to_string()],
                )
                .await;
            return Err(save_failed("stored artifact does not match what was written"));
        }

        logger.validation(true, "save", &[]).await;
        Ok(())
    }

    async fn clean_up(&self, logger: &BuildLogger, error: &GenerationError) {
        for action in FAILURE_CLEANUP {
            if let Err(reason) = self.apply(action, logger, error).await {
                warn!(
                    session_id = %logger.session_id(),
                    %action,
                    reason = %reason,
                    "Cleanup action failed"
                );
            }
        }
    }

    async fn apply(
        &self,
        action: CleanupAction,
        logger: &BuildLogger,
        error: &GenerationError,
    ) -> Result<(), String> {
        match action {
            CleanupAction::MarkProjectFailed => match logger.project_id() {
                Some(id) => self
                    .store
                    .update_project(id, ProjectUpdate::status(ProjectStatus::Failed))
                    .await
                    .map_err(|e| e.to_string()),
                None => Ok(()),
            },
            CleanupAction::LogError => {
                logger
                    .error(
                        error.message(),
                        json!({"code": error.code(), "location": format!("{}:{}", error.file, error.line)}),
                    )
                    .await;
                Ok(())
            }
            CleanupAction::FinalizeLog => logger
                .finalize(RunStatus::Failed)
                .await
                .map(|_| ())
                .ok_or_else(|| "durable build log write failed".to_string()),
        }
    }
}
