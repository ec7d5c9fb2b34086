//! Projects: one user-initiated website generation effort each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Lifecycle status of a project.
///
/// `Completed` and `Failed` are terminal for one attempt; a fresh request
/// moves the project back to `Generating`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, nothing generated yet
    Draft,
    /// A pipeline is running for this project
    Generating,
    /// Artifact generated and verified as stored
    Completed,
    /// Last attempt failed
    Failed,
}

impl ProjectStatus {
    /// Whether this status ends a generation attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

/// A stored project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Project {
    /// Unique identifier
    id: Uuid,
    /// Caller that owns the project
    owner_id: String,
    /// Display name
    name: String,
    /// Natural-language description of the desired site
    description: String,
    /// Website type tag (business, portfolio, ...)
    website_type: String,
    /// Industry tag
    industry: Option<String>,
    /// Serialized request settings
    settings: JsonValue,
    /// Final combined artifact, present after a successful run
    generated_code: Option<String>,
    /// Provider preferred for this project
    provider: Option<String>,
    /// Generation mode wire name
    mode: String,
    /// Lifecycle status
    status: ProjectStatus,
    /// Cumulative tokens across runs
    total_tokens: u64,
    /// Cumulative cost in USD
    total_cost: f64,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Last modification time
    updated_at: DateTime<Utc>,
}

impl Project {
    /// Materialize a project from its creation fields.
    pub fn from_new(id: Uuid, new: NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            website_type: new.website_type,
            industry: new.industry,
            settings: new.settings,
            generated_code: None,
            provider: new.provider,
            mode: new.mode,
            status: new.status,
            total_tokens: 0,
            total_cost: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a project from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        owner_id: String,
        name: String,
        description: String,
        website_type: String,
        industry: Option<String>,
        settings: JsonValue,
        generated_code: Option<String>,
        provider: Option<String>,
        mode: String,
        status: ProjectStatus,
        total_tokens: u64,
        total_cost: f64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            name,
            description,
            website_type,
            industry,
            settings,
            generated_code,
            provider,
            mode,
            status,
            total_tokens,
            total_cost,
            created_at,
            updated_at,
        }
    }

    /// Apply an update in place, touching `updated_at`.
    pub fn apply(&mut self, update: &ProjectUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(code) = &update.generated_code {
            self.generated_code = Some(code.clone());
        }
        if let Some(provider) = &update.provider {
            self.provider = Some(provider.clone());
        }
        if let Some(mode) = &update.mode {
            self.mode = mode.clone();
        }
        if let Some(tokens) = update.total_tokens {
            self.total_tokens = tokens;
        }
        if let Some(cost) = update.total_cost {
            self.total_cost = cost;
        }
        self.updated_at = now;
    }
}

/// Fields required to create a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct NewProject {
    /// Caller that owns the project
    pub owner_id: String,
    /// Display name
    #[builder(default = "\"New project\".to_string()")]
    pub name: String,
    /// Natural-language description
    pub description: String,
    /// Website type tag
    #[builder(default = "\"business\".to_string()")]
    pub website_type: String,
    /// Industry tag
    #[builder(default, setter(into, strip_option))]
    pub industry: Option<String>,
    /// Serialized request settings
    #[builder(default = "JsonValue::Null")]
    pub settings: JsonValue,
    /// Preferred provider
    #[builder(default, setter(into, strip_option))]
    pub provider: Option<String>,
    /// Generation mode wire name
    #[builder(default = "\"full_site\".to_string()")]
    pub mode: String,
    /// Initial status
    #[builder(default = "ProjectStatus::Draft")]
    pub status: ProjectStatus,
}

impl NewProject {
    /// Creates a new project builder.
    pub fn builder() -> NewProjectBuilder {
        NewProjectBuilder::default()
    }
}

/// Partial update of a project; `None` fields are left untouched.
///
/// # Examples
///
/// ```
/// use sitesmith_core::{ProjectStatus, ProjectUpdate};
///
/// let update = ProjectUpdate::default()
///     .with_status(ProjectStatus::Generating)
///     .with_total_tokens(1200u64);
/// assert_eq!(update.status, Some(ProjectStatus::Generating));
/// assert!(update.generated_code.is_none());
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_setters::Setters,
)]
#[setters(prefix = "with_", strip_option, into)]
pub struct ProjectUpdate {
    /// New lifecycle status
    pub status: Option<ProjectStatus>,
    /// New final artifact
    pub generated_code: Option<String>,
    /// New preferred provider
    pub provider: Option<String>,
    /// New mode wire name
    pub mode: Option<String>,
    /// New cumulative token count
    pub total_tokens: Option<u64>,
    /// New cumulative cost
    pub total_cost: Option<f64>,
}

impl ProjectUpdate {
    /// Shorthand for a status-only update.
    pub fn status(status: ProjectStatus) -> Self {
        Self::default().with_status(status)
    }
}

/// Filter and page for project listings. Results are ordered by most recent
/// activity first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectQuery {
    /// Restrict to one owner
    pub owner_id: Option<String>,
    /// Restrict to one status
    pub status: Option<ProjectStatus>,
    /// Page size
    pub limit: usize,
    /// Rows skipped before the page starts
    pub offset: usize,
}

impl Default for ProjectQuery {
    fn default() -> Self {
        Self {
            owner_id: None,
            status: None,
            limit: 20,
            offset: 0,
        }
    }
}

impl ProjectQuery {
    /// Projects of one owner, first page.
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    /// Restrict to `status`.
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Select a page.
    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Whether `project` passes the owner and status filters.
    pub fn matches(&self, project: &Project) -> bool {
        self.owner_id
            .as_deref()
            .is_none_or(|owner| project.owner_id == owner)
            && self.status.is_none_or(|status| project.status == status)
    }
}
