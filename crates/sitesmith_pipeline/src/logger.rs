//! Session-scoped build log with a live polling view.

use crate::Step;
use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use sitesmith_core::{BuildLogRecord, LogEntry, LogLevel, LogSummary, ProviderId, RunStatus};
use sitesmith_interface::{EphemeralStore, ProjectStore};
use sitesmith_rate_limit::LoggingSettings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const LIVE_KEY_PREFIX: &str = "live_log:";

/// Bounds of the live polling view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveViewSettings {
    /// Most recent entries kept in the view
    pub cap: usize,
    /// Expiry of the view after the last write
    pub ttl: Duration,
}

impl Default for LiveViewSettings {
    fn default() -> Self {
        Self {
            cap: 100,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&LoggingSettings> for LiveViewSettings {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            cap: settings.live_view_cap.max(1),
            ttl: Duration::from_secs(settings.live_view_ttl_secs),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    entries: Vec<LogEntry>,
    project_id: Option<Uuid>,
}

/// Leveled, timestamped log for one generation attempt.
///
/// Every entry is mirrored to `tracing` and to a capped live view in the
/// ephemeral store. [`finalize`](BuildLogger::finalize) writes the durable
/// record once and removes the live view.
pub struct BuildLogger {
    session_id: String,
    started: Instant,
    started_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    live: Arc<dyn EphemeralStore>,
    store: Arc<dyn ProjectStore>,
    settings: LiveViewSettings,
    finalized: OnceCell<Option<Uuid>>,
}

impl std::fmt::Debug for BuildLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLogger")
            .field("session_id", &self.session_id)
            .field("entries", &self.entries().len())
            .field("finalized", &self.finalized.initialized())
            .finish()
    }
}

/// Generate a fresh session id, e.g. `build_20250101_120000_<uuid>`.
pub fn new_session_id() -> String {
    format!(
        "build_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().simple()
    )
}

/// Ephemeral store key of a session's live view.
pub fn live_key(session_id: &str) -> String {
    format!("{}{}", LIVE_KEY_PREFIX, session_id)
}

impl BuildLogger {
    /// Start a new session.
    pub fn new(
        live: Arc<dyn EphemeralStore>,
        store: Arc<dyn ProjectStore>,
        settings: LiveViewSettings,
    ) -> Self {
        let session_id = new_session_id();
        debug!(session_id = %session_id, "Build log session started");
        Self {
            session_id,
            started: Instant::now(),
            started_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
            live,
            store,
            settings,
            finalized: OnceCell::new(),
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Attach the session to a project.
    pub fn set_project(&self, project_id: Uuid) {
        if let Ok(mut state) = self.state.lock() {
            state.project_id = Some(project_id);
        }
    }

    /// Project the session is attached to.
    pub fn project_id(&self) -> Option<Uuid> {
        self.state.lock().ok().and_then(|s| s.project_id)
    }

    /// Snapshot of all entries so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state
            .lock()
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    /// Milliseconds since the session started.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Append an entry and refresh the live view.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>, context: JsonValue) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            elapsed_ms: self.elapsed_ms(),
            level,
            message: message.into(),
            context,
        };
        self.mirror(&entry);

        let tail = match self.state.lock() {
            Ok(mut state) => {
                state.entries.push(entry);
                let start = state.entries.len().saturating_sub(self.settings.cap);
                state.entries[start..].to_vec()
            }
            Err(_) => return,
        };

        if self.finalized.initialized() {
            return;
        }
        match serde_json::to_value(&tail) {
            Ok(view) => {
                if let Err(e) = self
                    .live
                    .set(&live_key(&self.session_id), view, self.settings.ttl)
                    .await
                {
                    warn!(session_id = %self.session_id, error = %e, "Failed to update live log view");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize live log view"),
        }
    }

    fn mirror(&self, entry: &LogEntry) {
        let session = self.session_id.as_str();
        let message = entry.message.as_str();
        let context = &entry.context;
        match entry.level {
            LogLevel::Debug => debug!(session, elapsed_ms = entry.elapsed_ms, %context, "{}", message),
            LogLevel::Info => info!(session, elapsed_ms = entry.elapsed_ms, %context, "{}", message),
            LogLevel::Success => {
                info!(session, elapsed_ms = entry.elapsed_ms, success = true, %context, "{}", message)
            }
            LogLevel::Warning => warn!(session, elapsed_ms = entry.elapsed_ms, %context, "{}", message),
            LogLevel::Error => error!(session, elapsed_ms = entry.elapsed_ms, %context, "{}", message),
        }
    }

    /// Debug-level entry.
    pub async fn debug(&self, message: impl Into<String>, context: JsonValue) {
        self.log(LogLevel::Debug, message, context).await;
    }

    /// Info-level entry.
    pub async fn info(&self, message: impl Into<String>, context: JsonValue) {
        self.log(LogLevel::Info, message, context).await;
    }

    /// Warning-level entry.
    pub async fn warning(&self, message: impl Into<String>, context: JsonValue) {
        self.log(LogLevel::Warning, message, context).await;
    }

    /// Error-level entry.
    pub async fn error(&self, message: impl Into<String>, context: JsonValue) {
        self.log(LogLevel::Error, message, context).await;
    }

    /// Success-level entry.
    pub async fn success(&self, message: impl Into<String>, context: JsonValue) {
        self.log(LogLevel::Success, message, context).await;
    }

    /// A step is about to run.
    pub async fn step_start(&self, step: Step, total_steps: usize) {
        self.info(
            format!("Step {} ({}) started: {}", step.index(), step.name(), step.label()),
            json!({"step": step.index(), "name": step.name(), "total_steps": total_steps}),
        )
        .await;
    }

    /// A step produced its artifact.
    pub async fn step_complete(
        &self,
        step: Step,
        provider: ProviderId,
        tokens: u64,
        cost: f64,
        cached: bool,
        duration_ms: u64,
    ) {
        self.success(
            format!("Step {} ({}) completed", step.index(), step.name()),
            json!({
                "step": step.index(),
                "provider": provider,
                "tokens": tokens,
                "cost": cost,
                "cached": cached,
                "duration_ms": duration_ms,
            }),
        )
        .await;
    }

    /// A step failed.
    pub async fn step_failed(&self, step: Step, reason: &str) {
        self.error(
            format!("Step {} ({}) failed: {}", step.index(), step.name(), reason),
            json!({"step": step.index(), "error": reason}),
        )
        .await;
    }

    /// A provider is being called.
    pub async fn provider_request(&self, provider: ProviderId, model: &str, prompt_chars: usize) {
        self.debug(
            format!("Requesting {} ({})", provider.label(), model),
            json!({"provider": provider, "model": model, "prompt_chars": prompt_chars}),
        )
        .await;
    }

    /// A provider answered.
    pub async fn provider_response(
        &self,
        provider: ProviderId,
        tokens: u64,
        cost: f64,
        duration_ms: u64,
    ) {
        self.info(
            format!("{} responded", provider.label()),
            json!({"provider": provider, "tokens": tokens, "cost": cost, "duration_ms": duration_ms}),
        )
        .await;
    }

    /// A provider call failed and failover continues.
    pub async fn provider_error(&self, provider: ProviderId, code: &str, message: &str) {
        self.warning(
            format!("{} failed: {}", provider.label(), message),
            json!({"provider": provider, "code": code, "error": message}),
        )
        .await;
    }

    /// Result of a validator check.
    pub async fn validation(&self, passed: bool, check: &str, errors: &[String]) {
        let context = json!({"check": check, "passed": passed, "errors": errors});
        if passed {
            self.info(format!("Validation passed: {}", check), context)
                .await;
        } else {
            self.error(
                format!("Validation failed: {}: {}", check, errors.join("; ")),
                context,
            )
            .await;
        }
    }

    /// Write the durable record and drop the live view.
    ///
    /// Only the first call writes; later calls return the first result.
    /// `None` means the durable write failed.
    pub async fn finalize(&self, status: RunStatus) -> Option<Uuid> {
        *self
            .finalized
            .get_or_init(|| async move {
                let duration_ms = self.elapsed_ms();
                let (entries, project_id) = match self.state.lock() {
                    Ok(state) => (state.entries.clone(), state.project_id),
                    Err(_) => (Vec::new(), None),
                };
                let record = BuildLogRecord {
                    id: Uuid::new_v4(),
                    session_id: self.session_id.clone(),
                    project_id,
                    status,
                    summary: LogSummary::from_entries(&entries, duration_ms),
                    entries,
                    duration_ms,
                    created_at: self.started_at,
                };

                let saved = match self.store.save_build_log(record).await {
                    Ok(id) => {
                        info!(session_id = %self.session_id, %status, duration_ms, "Build log finalized");
                        Some(id)
                    }
                    Err(e) => {
                        error!(session_id = %self.session_id, error = %e, "Failed to persist build log");
                        None
                    }
                };

                if let Err(e) = self.live.delete(&live_key(&self.session_id)).await {
                    warn!(session_id = %self.session_id, error = %e, "Failed to delete live log view");
                }
                saved
            })
            .await
    }

    /// Read a session's live view; empty once finalized or expired.
    pub async fn live_log(live: &dyn EphemeralStore, session_id: &str) -> Vec<LogEntry> {
        match live.get(&live_key(session_id)).await {
            Ok(Some(view)) => serde_json::from_value(view).unwrap_or_else(|e| {
                warn!(session_id, error = %e, "Corrupt live log view");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to read live log view");
                Vec::new()
            }
        }
    }
}
