//! In-memory implementation of [`ProjectStore`].
//!
//! Useful for tests and for running the engine without a database. All data
//! is lost when the store is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitesmith_core::{
    BuildLogRecord, DailyUsage, GenerationRecord, NewProject, Project, ProjectQuery,
    ProjectUpdate, UsageRecord, UsageSummary,
};
use sitesmith_error::{StorageError, StorageErrorKind, StorageResult};
use sitesmith_interface::ProjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<Uuid, Project>,
    step_records: Vec<GenerationRecord>,
    usage: Vec<UsageRecord>,
    build_logs: Vec<BuildLogRecord>,
}

/// Project store backed by in-process tables.
///
/// # Example
///
/// ```
/// use sitesmith_core::NewProject;
/// use sitesmith_interface::ProjectStore;
/// use sitesmith_pipeline::InMemoryProjectStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryProjectStore::new();
/// let project = NewProject::builder()
///     .owner_id("u1")
///     .description("bakery site")
///     .build()?;
/// let id = store.create_project(project).await?;
/// assert!(store.get_project(id).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryProjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored projects.
    pub async fn project_count(&self) -> usize {
        self.tables.read().await.projects.len()
    }

    /// Every usage record in append order.
    pub async fn usage_records(&self) -> Vec<UsageRecord> {
        self.tables.read().await.usage.clone()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create_project(&self, project: NewProject) -> StorageResult<Uuid> {
        let id = Uuid::new_v4();
        self.tables
            .write()
            .await
            .projects
            .insert(id, Project::from_new(id, project, Utc::now()));
        Ok(id)
    }

    async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let project = tables.projects.get_mut(&id).ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(format!("project {}", id)))
        })?;
        project.apply(&update, Utc::now());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> StorageResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, query: ProjectQuery) -> StorageResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .tables
            .read()
            .await
            .projects
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.updated_at().cmp(a.updated_at()));
        Ok(projects
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn count_projects(&self, owner_id: Option<&str>) -> StorageResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .projects
            .values()
            .filter(|p| owner_id.is_none_or(|owner| p.owner_id() == owner))
            .count();
        Ok(count as u64)
    }

    async fn delete_project(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        tables.step_records.retain(|r| *r.project_id() != id);
        Ok(tables.projects.remove(&id).is_some())
    }

    async fn save_step_record(&self, record: GenerationRecord) -> StorageResult<Uuid> {
        let id = *record.id();
        self.tables.write().await.step_records.push(record);
        Ok(id)
    }

    async fn list_step_records(&self, project_id: Uuid) -> StorageResult<Vec<GenerationRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .step_records
            .iter()
            .filter(|r| *r.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn append_usage(&self, record: UsageRecord) -> StorageResult<()> {
        self.tables.write().await.usage.push(record);
        Ok(())
    }

    async fn usage_summary(&self, owner_id: Option<&str>) -> StorageResult<UsageSummary> {
        let tables = self.tables.read().await;
        let mut summary = UsageSummary::default();
        tables
            .usage
            .iter()
            .filter(|r| owner_id.is_none_or(|owner| r.owner_id() == owner))
            .for_each(|r| summary.add(r));
        Ok(summary)
    }

    async fn daily_usage(
        &self,
        owner_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyUsage>> {
        let tables = self.tables.read().await;
        Ok(DailyUsage::bucket(tables.usage.iter().filter(|r| {
            *r.created_at() >= since && owner_id.is_none_or(|owner| r.owner_id() == owner)
        })))
    }

    async fn cleanup_usage(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        let mut tables = self.tables.write().await;
        let before = tables.usage.len();
        tables.usage.retain(|r| *r.created_at() >= older_than);
        Ok(before - tables.usage.len())
    }

    async fn save_build_log(&self, record: BuildLogRecord) -> StorageResult<Uuid> {
        let mut tables = self.tables.write().await;
        if tables
            .build_logs
            .iter()
            .any(|r| r.session_id == record.session_id)
        {
            return Err(StorageError::new(StorageErrorKind::Query(format!(
                "build log for session {} already exists",
                record.session_id
            ))));
        }
        let id = record.id;
        tables.build_logs.push(record);
        Ok(id)
    }

    async fn get_build_log(&self, session_id: &str) -> StorageResult<Option<BuildLogRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .build_logs
            .iter()
            .find(|r| r.session_id == session_id)
            .cloned())
    }

    async fn recent_build_logs(&self, limit: usize) -> StorageResult<Vec<BuildLogRecord>> {
        let mut logs = self.tables.read().await.build_logs.clone();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs)
    }

    async fn cleanup_build_logs(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        let mut tables = self.tables.write().await;
        let before = tables.build_logs.len();
        tables.build_logs.retain(|r| r.created_at >= older_than);
        Ok(before - tables.build_logs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_core::ProjectStatus;

    fn new_project(owner: &str) -> NewProject {
        NewProject::builder()
            .owner_id(owner)
            .description("bakery site")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_applies_partial_fields() {
        let store = InMemoryProjectStore::new();
        let id = store.create_project(new_project("u1")).await.unwrap();
        store
            .update_project(
                id,
                ProjectUpdate::status(ProjectStatus::Generating).with_total_tokens(10u64),
            )
            .await
            .unwrap();
        let project = store.get_project(id).await.unwrap().unwrap();
        assert_eq!(*project.status(), ProjectStatus::Generating);
        assert_eq!(*project.total_tokens(), 10);
        assert!(project.generated_code().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_project() {
        let store = InMemoryProjectStore::new();
        let err = store
            .update_project(Uuid::new_v4(), ProjectUpdate::status(ProjectStatus::Failed))
            .await
            .unwrap_err();
        assert!(matches!(err.kind, StorageErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_usage_summary_by_owner() {
        let store = InMemoryProjectStore::new();
        for (owner, tokens) in [("a", 10u64), ("a", 5), ("b", 7)] {
            let record = UsageRecord::builder()
                .owner_id(owner)
                .provider("deepseek")
                .operation("generate_phase_1")
                .input_tokens(tokens)
                .build()
                .unwrap();
            store.append_usage(record).await.unwrap();
        }
        let a = store.usage_summary(Some("a")).await.unwrap();
        assert_eq!(a.total_requests, 2);
        assert_eq!(a.input_tokens, 15);
        assert_eq!(a.by_provider["deepseek"].requests, 2);
        assert_eq!(store.usage_summary(None).await.unwrap().total_requests, 3);

        let daily = store
            .daily_usage(Some("b"), Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].totals.input_tokens, 7);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages_newest_first() {
        let store = InMemoryProjectStore::new();
        let mut ids = Vec::new();
        for owner in ["a", "a", "a", "b"] {
            ids.push(store.create_project(new_project(owner)).await.unwrap());
        }
        store
            .update_project(ids[0], ProjectUpdate::status(ProjectStatus::Failed))
            .await
            .unwrap();

        let page = store
            .list_projects(ProjectQuery::owner("a").with_page(2, 0))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(*page[0].id(), ids[0]);

        let rest = store
            .list_projects(ProjectQuery::owner("a").with_page(2, 2))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);

        let failed = store
            .list_projects(ProjectQuery::default().with_status(ProjectStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(store.count_projects(Some("a")).await.unwrap(), 3);
        assert_eq!(store.count_projects(None).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_removes_step_records() {
        let store = InMemoryProjectStore::new();
        let id = store.create_project(new_project("a")).await.unwrap();
        let record = GenerationRecord::builder()
            .project_id(id)
            .step(1u8)
            .step_name("structure")
            .provider("deepseek")
            .prompt("p")
            .build()
            .unwrap();
        store.save_step_record(record).await.unwrap();

        assert!(store.delete_project(id).await.unwrap());
        assert!(store.get_project(id).await.unwrap().is_none());
        assert!(store.list_step_records(id).await.unwrap().is_empty());
        assert!(!store.delete_project(id).await.unwrap());
    }
}
