//! Persistence traits: the durable project store and the short-lived keyed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sitesmith_core::{
    BuildLogRecord, DailyUsage, GenerationRecord, NewProject, Project, ProjectQuery,
    ProjectUpdate, UsageRecord, UsageSummary,
};
use sitesmith_error::StorageResult;
use std::time::Duration;
use uuid::Uuid;

/// Durable store for projects, step records, usage and build logs.
///
/// Implementations must return exactly what was last written from
/// [`get_project`](ProjectStore::get_project); the orchestrator relies on
/// read-back to confirm a save.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Create a project and return its identifier.
    async fn create_project(&self, project: NewProject) -> StorageResult<Uuid>;

    /// Apply a partial update to a project.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` storage error when no project has the given id.
    async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> StorageResult<()>;

    /// Fetch a project, `None` when absent.
    async fn get_project(&self, id: Uuid) -> StorageResult<Option<Project>>;

    /// One page of projects matching `query`, most recently updated first.
    async fn list_projects(&self, query: ProjectQuery) -> StorageResult<Vec<Project>>;

    /// Number of projects, optionally restricted to one owner.
    async fn count_projects(&self, owner_id: Option<&str>) -> StorageResult<u64>;

    /// Delete a project together with its step records.
    ///
    /// Returns `false` when no project had the given id.
    async fn delete_project(&self, id: Uuid) -> StorageResult<bool>;

    /// Persist one step trace and return its identifier.
    async fn save_step_record(&self, record: GenerationRecord) -> StorageResult<Uuid>;

    /// Step traces for a project ordered by creation.
    async fn list_step_records(&self, project_id: Uuid) -> StorageResult<Vec<GenerationRecord>>;

    /// Append a usage ledger entry.
    async fn append_usage(&self, record: UsageRecord) -> StorageResult<()>;

    /// Aggregate usage, optionally restricted to one owner.
    async fn usage_summary(&self, owner_id: Option<&str>) -> StorageResult<UsageSummary>;

    /// Usage per UTC day since `since`, newest day first.
    async fn daily_usage(
        &self,
        owner_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyUsage>>;

    /// Delete usage entries created before the cutoff, returning how many.
    async fn cleanup_usage(&self, older_than: DateTime<Utc>) -> StorageResult<usize>;

    /// Persist a finalized build log and return its identifier.
    async fn save_build_log(&self, record: BuildLogRecord) -> StorageResult<Uuid>;

    /// Fetch a finalized build log by session id.
    async fn get_build_log(&self, session_id: &str) -> StorageResult<Option<BuildLogRecord>>;

    /// Most recent finalized build logs, newest first.
    async fn recent_build_logs(&self, limit: usize) -> StorageResult<Vec<BuildLogRecord>>;

    /// Delete build logs created before the cutoff, returning how many.
    async fn cleanup_build_logs(&self, older_than: DateTime<Utc>) -> StorageResult<usize>;
}

/// Keyed store with per-entry expiry, shared by the response cache and the
/// live build-log view.
///
/// Concurrent writers to the same key are allowed; the last write wins.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Read a live value, `None` on miss or expiry.
    async fn get(&self, key: &str) -> StorageResult<Option<JsonValue>>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) -> StorageResult<()>;

    /// Remove a value if present.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
