//! Project store wrapper that injects failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitesmith_core::{
    BuildLogRecord, DailyUsage, GenerationRecord, NewProject, Project, ProjectQuery,
    ProjectUpdate, UsageRecord, UsageSummary,
};
use sitesmith_error::{StorageError, StorageErrorKind, StorageResult};
use sitesmith_interface::ProjectStore;
use sitesmith_pipeline::InMemoryProjectStore;
use uuid::Uuid;

/// Which operations misbehave.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Read-back returns a different artifact than was written
    pub corrupt_read_back: bool,
    /// Writes carrying an artifact fail
    pub fail_code_write: bool,
    /// Step record writes fail
    pub fail_step_records: bool,
    /// Build log writes fail
    pub fail_build_log: bool,
    /// Status-only updates fail
    pub fail_status_updates: bool,
}

/// In-memory store with configurable faults.
#[derive(Debug, Default)]
pub struct FaultyStore {
    /// Backing store, inspectable by tests
    pub inner: InMemoryProjectStore,
    faults: Faults,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: InMemoryProjectStore::new(),
            faults,
        }
    }

    fn injected(what: &str) -> StorageError {
        StorageError::new(StorageErrorKind::Unavailable(format!("injected {} fault", what)))
    }
}

#[async_trait]
impl ProjectStore for FaultyStore {
    async fn create_project(&self, project: NewProject) -> StorageResult<Uuid> {
        self.inner.create_project(project).await
    }

    async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> StorageResult<()> {
        if self.faults.fail_code_write && update.generated_code.is_some() {
            return Err(Self::injected("code write"));
        }
        if self.faults.fail_status_updates && update.generated_code.is_none() {
            return Err(Self::injected("status update"));
        }
        self.inner.update_project(id, update).await
    }

    async fn get_project(&self, id: Uuid) -> StorageResult<Option<Project>> {
        let project = self.inner.get_project(id).await?;
        if !self.faults.corrupt_read_back {
            return Ok(project);
        }
        Ok(match project {
            Some(mut project) if project.generated_code().is_some() => {
                project.apply(
                    &ProjectUpdate::default().with_generated_code("<p>truncated</p>"),
                    Utc::now(),
                );
                Some(project)
            }
            other => other,
        })
    }

    async fn list_projects(&self, query: ProjectQuery) -> StorageResult<Vec<Project>> {
        self.inner.list_projects(query).await
    }

    async fn count_projects(&self, owner_id: Option<&str>) -> StorageResult<u64> {
        self.inner.count_projects(owner_id).await
    }

    async fn delete_project(&self, id: Uuid) -> StorageResult<bool> {
        self.inner.delete_project(id).await
    }

    async fn save_step_record(&self, record: GenerationRecord) -> StorageResult<Uuid> {
        if self.faults.fail_step_records {
            return Err(Self::injected("step record"));
        }
        self.inner.save_step_record(record).await
    }

    async fn list_step_records(&self, project_id: Uuid) -> StorageResult<Vec<GenerationRecord>> {
        self.inner.list_step_records(project_id).await
    }

    async fn append_usage(&self, record: UsageRecord) -> StorageResult<()> {
        self.inner.append_usage(record).await
    }

    async fn usage_summary(&self, owner_id: Option<&str>) -> StorageResult<UsageSummary> {
        self.inner.usage_summary(owner_id).await
    }

    async fn daily_usage(
        &self,
        owner_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyUsage>> {
        self.inner.daily_usage(owner_id, since).await
    }

    async fn cleanup_usage(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        self.inner.cleanup_usage(older_than).await
    }

    async fn save_build_log(&self, record: BuildLogRecord) -> StorageResult<Uuid> {
        if self.faults.fail_build_log {
            return Err(Self::injected("build log"));
        }
        self.inner.save_build_log(record).await
    }

    async fn get_build_log(&self, session_id: &str) -> StorageResult<Option<BuildLogRecord>> {
        self.inner.get_build_log(session_id).await
    }

    async fn recent_build_logs(&self, limit: usize) -> StorageResult<Vec<BuildLogRecord>> {
        self.inner.recent_build_logs(limit).await
    }

    async fn cleanup_build_logs(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        self.inner.cleanup_build_logs(older_than).await
    }
}
