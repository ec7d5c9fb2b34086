//! Build log entries and their durable record.

use crate::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Severity of a build log entry.
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
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    Info,
    /// Recoverable problem
    Warning,
    /// Failure
    Error,
    /// Milestone reached
    Success,
}

/// One timestamped build log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock time of the entry
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the session started
    pub elapsed_ms: u64,
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
    /// Structured context
    #[serde(default)]
    pub context: JsonValue,
}

/// Summary written when a session is finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Number of entries recorded
    pub total_entries: usize,
    /// Entries at error level
    pub errors: usize,
    /// Entries at warning level
    pub warnings: usize,
    /// Session length in seconds, two decimals
    pub elapsed_sec: f64,
}

impl LogSummary {
    /// Summarize a list of entries over an elapsed duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitesmith_core::LogSummary;
    ///
    /// let summary = LogSummary::from_entries(&[], 1234);
    /// assert_eq!(summary.total_entries, 0);
    /// assert_eq!(summary.elapsed_sec, 1.23);
    /// ```
    pub fn from_entries(entries: &[LogEntry], elapsed_ms: u64) -> Self {
        let count = |level: LogLevel| entries.iter().filter(|e| e.level == level).count();
        Self {
            total_entries: entries.len(),
            errors: count(LogLevel::Error),
            warnings: count(LogLevel::Warning),
            elapsed_sec: (elapsed_ms as f64 / 10.0).round() / 100.0,
        }
    }
}

/// Durable record of a finished build session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildLogRecord {
    /// Record identifier
    pub id: Uuid,
    /// Session identifier
    pub session_id: String,
    /// Project the session belonged to
    pub project_id: Option<Uuid>,
    /// Final status
    pub status: RunStatus,
    /// All entries in order
    pub entries: Vec<LogEntry>,
    /// Summary counts
    pub summary: LogSummary,
    /// Session duration
    pub duration_ms: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
