//! Diesel implementation of [`ProjectStore`].

use crate::connection::{SqlitePool, establish_pool, run_migrations};
use crate::models::{BuildLogRow, GenerationRecordRow, ProjectRow, UsageRecordRow};
use crate::schema::{build_logs, generation_records, projects, usage_records};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use sitesmith_core::{
    BuildLogRecord, DailyUsage, GenerationRecord, NewProject, Project, ProjectQuery,
    ProjectUpdate, UsageRecord, UsageSummary,
};
use sitesmith_error::{StorageError, StorageErrorKind, StorageResult};
use sitesmith_interface::ProjectStore;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Durable project store on SQLite.
///
/// Diesel is synchronous, so every operation runs on the blocking pool with
/// its own pooled connection.
///
/// # Example
///
/// ```no_run
/// use sitesmith_database::SqliteProjectStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteProjectStore::connect("sitesmith.db")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteProjectStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProjectStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl SqliteProjectStore {
    /// Open the database at `url` and apply migrations.
    pub fn connect(url: &str) -> StorageResult<Self> {
        let pool = establish_pool(url)?;
        run_migrations(&pool)?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database with migrations applied.
    pub fn in_memory() -> StorageResult<Self> {
        Self::connect(":memory:")
    }

    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> StorageResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?
    }
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    #[instrument(skip(self, project), fields(owner = %project.owner_id))]
    async fn create_project(&self, project: NewProject) -> StorageResult<Uuid> {
        let id = Uuid::new_v4();
        let row = ProjectRow::from_project(&Project::from_new(id, project, Utc::now()))?;
        self.with_conn(move |conn| {
            diesel::insert_into(projects::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        debug!(%id, "Project created");
        Ok(id)
    }

    #[instrument(skip(self, update))]
    async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> StorageResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let row: Option<ProjectRow> = projects::table
                    .find(id.to_string())
                    .select(ProjectRow::as_select())
                    .first(conn)
                    .optional()?;
                let Some(row) = row else {
                    return Err(StorageError::new(StorageErrorKind::NotFound(format!(
                        "project {}",
                        id
                    ))));
                };
                let mut project = Project::try_from(row)?;
                project.apply(&update, Utc::now());
                let row = ProjectRow::from_project(&project)?;
                diesel::update(projects::table.find(id.to_string()))
                    .set(&row)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_project(&self, id: Uuid) -> StorageResult<Option<Project>> {
        self.with_conn(move |conn| {
            projects::table
                .find(id.to_string())
                .select(ProjectRow::as_select())
                .first::<ProjectRow>(conn)
                .optional()?
                .map(Project::try_from)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_projects(&self, query: ProjectQuery) -> StorageResult<Vec<Project>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut rows = projects::table
                .select(ProjectRow::as_select())
                .into_boxed();
            if let Some(owner) = query.owner_id {
                rows = rows.filter(projects::owner_id.eq(owner));
            }
            if let Some(status) = query.status {
                rows = rows.filter(projects::status.eq(status.to_string()));
            }
            rows.order(projects::updated_at.desc())
                .limit(limit)
                .offset(offset)
                .load::<ProjectRow>(conn)?
                .into_iter()
                .map(Project::try_from)
                .collect()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn count_projects(&self, owner_id: Option<&str>) -> StorageResult<u64> {
        let owner = owner_id.map(str::to_string);
        self.with_conn(move |conn| {
            let mut query = projects::table.count().into_boxed();
            if let Some(owner) = owner {
                query = query.filter(projects::owner_id.eq(owner));
            }
            let count: i64 = query.get_result(conn)?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, id: Uuid) -> StorageResult<bool> {
        let deleted = self
            .with_conn(move |conn| {
                conn.transaction(|conn| {
                    diesel::delete(
                        generation_records::table
                            .filter(generation_records::project_id.eq(id.to_string())),
                    )
                    .execute(conn)?;
                    Ok(diesel::delete(projects::table.find(id.to_string())).execute(conn)? > 0)
                })
            })
            .await?;
        debug!(%id, deleted, "Project deleted");
        Ok(deleted)
    }

    #[instrument(skip(self, record), fields(project_id = %record.project_id(), step = record.step()))]
    async fn save_step_record(&self, record: GenerationRecord) -> StorageResult<Uuid> {
        let id = *record.id();
        let row = GenerationRecordRow::from(&record);
        self.with_conn(move |conn| {
            diesel::insert_into(generation_records::table)
                .values(&row)
                .execute(conn)?;
            Ok(id)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_step_records(&self, project_id: Uuid) -> StorageResult<Vec<GenerationRecord>> {
        self.with_conn(move |conn| {
            generation_records::table
                .filter(generation_records::project_id.eq(project_id.to_string()))
                .order((
                    generation_records::created_at.asc(),
                    generation_records::step.asc(),
                ))
                .select(GenerationRecordRow::as_select())
                .load::<GenerationRecordRow>(conn)?
                .into_iter()
                .map(GenerationRecord::try_from)
                .collect()
        })
        .await
    }

    #[instrument(skip(self, record), fields(operation = %record.operation()))]
    async fn append_usage(&self, record: UsageRecord) -> StorageResult<()> {
        let row = UsageRecordRow::from(&record);
        self.with_conn(move |conn| {
            diesel::insert_into(usage_records::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn usage_summary(&self, owner_id: Option<&str>) -> StorageResult<UsageSummary> {
        let owner = owner_id.map(str::to_string);
        self.with_conn(move |conn| {
            let mut query = usage_records::table
                .select(UsageRecordRow::as_select())
                .into_boxed();
            if let Some(owner) = owner {
                query = query.filter(usage_records::owner_id.eq(owner));
            }
            let mut summary = UsageSummary::default();
            for row in query.load::<UsageRecordRow>(conn)? {
                summary.add(&UsageRecord::try_from(row)?);
            }
            Ok(summary)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn daily_usage(
        &self,
        owner_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyUsage>> {
        let owner = owner_id.map(str::to_string);
        let since = since.naive_utc();
        self.with_conn(move |conn| {
            let mut query = usage_records::table
                .filter(usage_records::created_at.ge(since))
                .select(UsageRecordRow::as_select())
                .into_boxed();
            if let Some(owner) = owner {
                query = query.filter(usage_records::owner_id.eq(owner));
            }
            let records = query
                .load::<UsageRecordRow>(conn)?
                .into_iter()
                .map(UsageRecord::try_from)
                .collect::<StorageResult<Vec<_>>>()?;
            Ok(DailyUsage::bucket(&records))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn cleanup_usage(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        let cutoff = older_than.naive_utc();
        self.with_conn(move |conn| {
            Ok(
                diesel::delete(usage_records::table.filter(usage_records::created_at.lt(cutoff)))
                    .execute(conn)?,
            )
        })
        .await
    }

    #[instrument(skip(self, record), fields(session_id = %record.session_id))]
    async fn save_build_log(&self, record: BuildLogRecord) -> StorageResult<Uuid> {
        let id = record.id;
        let row = BuildLogRow::from_record(&record)?;
        self.with_conn(move |conn| {
            diesel::insert_into(build_logs::table)
                .values(&row)
                .execute(conn)?;
            Ok(id)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_build_log(&self, session_id: &str) -> StorageResult<Option<BuildLogRecord>> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            build_logs::table
                .filter(build_logs::session_id.eq(session_id))
                .select(BuildLogRow::as_select())
                .first::<BuildLogRow>(conn)
                .optional()?
                .map(BuildLogRecord::try_from)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn recent_build_logs(&self, limit: usize) -> StorageResult<Vec<BuildLogRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            build_logs::table
                .order(build_logs::created_at.desc())
                .limit(limit)
                .select(BuildLogRow::as_select())
                .load::<BuildLogRow>(conn)?
                .into_iter()
                .map(BuildLogRecord::try_from)
                .collect()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn cleanup_build_logs(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        let cutoff = older_than.naive_utc();
        self.with_conn(move |conn| {
            Ok(
                diesel::delete(build_logs::table.filter(build_logs::created_at.lt(cutoff)))
                    .execute(conn)?,
            )
        })
        .await
    }
}
