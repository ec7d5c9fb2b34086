//! Diesel row models and conversions to domain types.

#![allow(missing_docs)]

use crate::schema::{build_logs, generation_records, projects, usage_records};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use sitesmith_core::{
    BuildLogRecord, GenerationRecord, LogEntry, LogSummary, Project, ProjectStatus, RunStatus,
    UsageRecord,
};
use sitesmith_error::{StorageError, StorageErrorKind, StorageResult};
use std::str::FromStr;
use uuid::Uuid;

#[track_caller]
fn corrupt(what: &str, detail: impl std::fmt::Display) -> StorageError {
    StorageError::new(StorageErrorKind::Serialization(format!(
        "Invalid {} in database: {}",
        what, detail
    )))
}

pub(crate) fn parse_uuid(value: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| corrupt("uuid", e))
}

pub(crate) fn to_utc(value: NaiveDateTime) -> DateTime<Utc> {
    value.and_utc()
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Row in the `projects` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProjectRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub website_type: String,
    pub industry: Option<String>,
    pub settings: String,
    pub generated_code: Option<String>,
    pub provider: Option<String>,
    pub mode: String,
    pub status: String,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProjectRow {
    pub(crate) fn from_project(project: &Project) -> StorageResult<Self> {
        Ok(Self {
            id: project.id().to_string(),
            owner_id: project.owner_id().clone(),
            name: project.name().clone(),
            description: project.description().clone(),
            website_type: project.website_type().clone(),
            industry: project.industry().clone(),
            settings: serde_json::to_string(project.settings())?,
            generated_code: project.generated_code().clone(),
            provider: project.provider().clone(),
            mode: project.mode().clone(),
            status: project.status().to_string(),
            total_tokens: to_i64(*project.total_tokens()),
            total_cost: *project.total_cost(),
            created_at: project.created_at().naive_utc(),
            updated_at: project.updated_at().naive_utc(),
        })
    }
}

impl TryFrom<ProjectRow> for Project {
    type Error = StorageError;

    fn try_from(row: ProjectRow) -> StorageResult<Self> {
        Ok(Project::from_parts(
            parse_uuid(&row.id)?,
            row.owner_id,
            row.name,
            row.description,
            row.website_type,
            row.industry,
            serde_json::from_str(&row.settings)?,
            row.generated_code,
            row.provider,
            row.mode,
            ProjectStatus::from_str(&row.status).map_err(|e| corrupt("project status", e))?,
            to_u64(row.total_tokens),
            row.total_cost,
            to_utc(row.created_at),
            to_utc(row.updated_at),
        ))
    }
}

/// Row in the `generation_records` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = generation_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GenerationRecordRow {
    pub id: String,
    pub project_id: String,
    pub step: i32,
    pub step_name: String,
    pub provider: String,
    pub prompt: String,
    pub response: String,
    pub code: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost: f64,
    pub duration_ms: i64,
    pub status: String,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<&GenerationRecord> for GenerationRecordRow {
    fn from(record: &GenerationRecord) -> Self {
        Self {
            id: record.id().to_string(),
            project_id: record.project_id().to_string(),
            step: i32::from(*record.step()),
            step_name: record.step_name().clone(),
            provider: record.provider().clone(),
            prompt: record.prompt().clone(),
            response: record.response().clone(),
            code: record.code().clone(),
            prompt_tokens: to_i64(*record.prompt_tokens()),
            completion_tokens: to_i64(*record.completion_tokens()),
            cost: *record.cost(),
            duration_ms: to_i64(*record.duration_ms()),
            status: record.status().to_string(),
            error: record.error().clone(),
            created_at: record.created_at().naive_utc(),
        }
    }
}

impl TryFrom<GenerationRecordRow> for GenerationRecord {
    type Error = StorageError;

    fn try_from(row: GenerationRecordRow) -> StorageResult<Self> {
        let mut builder = GenerationRecord::builder();
        builder
            .id(parse_uuid(&row.id)?)
            .project_id(parse_uuid(&row.project_id)?)
            .step(u8::try_from(row.step).map_err(|e| corrupt("step index", e))?)
            .step_name(row.step_name)
            .provider(row.provider)
            .prompt(row.prompt)
            .response(row.response)
            .code(row.code)
            .prompt_tokens(to_u64(row.prompt_tokens))
            .completion_tokens(to_u64(row.completion_tokens))
            .cost(row.cost)
            .duration_ms(to_u64(row.duration_ms))
            .status(RunStatus::from_str(&row.status).map_err(|e| corrupt("run status", e))?)
            .created_at(to_utc(row.created_at));
        if let Some(error) = row.error {
            builder.error(error);
        }
        builder.build().map_err(|e| corrupt("generation record", e))
    }
}

/// Row in the `usage_records` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = usage_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UsageRecordRow {
    pub id: String,
    pub owner_id: String,
    pub project_id: Option<String>,
    pub provider: String,
    pub operation: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
    pub created_at: NaiveDateTime,
}

impl From<&UsageRecord> for UsageRecordRow {
    fn from(record: &UsageRecord) -> Self {
        Self {
            id: record.id().to_string(),
            owner_id: record.owner_id().clone(),
            project_id: record.project_id().map(|id| id.to_string()),
            provider: record.provider().clone(),
            operation: record.operation().clone(),
            input_tokens: to_i64(*record.input_tokens()),
            output_tokens: to_i64(*record.output_tokens()),
            cost: *record.cost(),
            created_at: record.created_at().naive_utc(),
        }
    }
}

impl TryFrom<UsageRecordRow> for UsageRecord {
    type Error = StorageError;

    fn try_from(row: UsageRecordRow) -> StorageResult<Self> {
        let mut builder = UsageRecord::builder();
        builder
            .id(parse_uuid(&row.id)?)
            .owner_id(row.owner_id)
            .provider(row.provider)
            .operation(row.operation)
            .input_tokens(to_u64(row.input_tokens))
            .output_tokens(to_u64(row.output_tokens))
            .cost(row.cost)
            .created_at(to_utc(row.created_at));
        if let Some(project_id) = row.project_id {
            builder.project_id(parse_uuid(&project_id)?);
        }
        builder.build().map_err(|e| corrupt("usage record", e))
    }
}

/// Row in the `build_logs` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = build_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BuildLogRow {
    pub id: String,
    pub session_id: String,
    pub project_id: Option<String>,
    pub status: String,
    pub entries: String,
    pub summary: String,
    pub duration_ms: i64,
    pub created_at: NaiveDateTime,
}

impl BuildLogRow {
    pub(crate) fn from_record(record: &BuildLogRecord) -> StorageResult<Self> {
        Ok(Self {
            id: record.id.to_string(),
            session_id: record.session_id.clone(),
            project_id: record.project_id.map(|id| id.to_string()),
            status: record.status.to_string(),
            entries: serde_json::to_string(&record.entries)?,
            summary: serde_json::to_string(&record.summary)?,
            duration_ms: to_i64(record.duration_ms),
            created_at: record.created_at.naive_utc(),
        })
    }
}

impl TryFrom<BuildLogRow> for BuildLogRecord {
    type Error = StorageError;

    fn try_from(row: BuildLogRow) -> StorageResult<Self> {
        let entries: Vec<LogEntry> = serde_json::from_str(&row.entries)?;
        let summary: LogSummary = serde_json::from_str(&row.summary)?;
        Ok(BuildLogRecord {
            id: parse_uuid(&row.id)?,
            session_id: row.session_id,
            project_id: row.project_id.as_deref().map(parse_uuid).transpose()?,
            status: RunStatus::from_str(&row.status).map_err(|e| corrupt("run status", e))?,
            entries,
            summary,
            duration_ms: to_u64(row.duration_ms),
            created_at: to_utc(row.created_at),
        })
    }
}
