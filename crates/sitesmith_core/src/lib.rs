//! Core data types for the Sitesmith website generation engine.
//!
//! This crate holds the records that flow between the pipeline, the provider
//! adapters and the persistent store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod completion;
mod log;
mod project;
mod provider;
mod record;
mod request;

pub use completion::{
    CompletionOptions, CompletionOptionsBuilder, CompletionResult, CompletionResultBuilder,
    ImageInput, default_system_prompt,
};
pub use log::{BuildLogRecord, LogEntry, LogLevel, LogSummary};
pub use project::{
    NewProject, NewProjectBuilder, Project, ProjectQuery, ProjectStatus, ProjectUpdate,
};
pub use provider::ProviderId;
pub use record::{
    DailyUsage, GenerationRecord, GenerationRecordBuilder, RunStatus, UsageRecord,
    UsageRecordBuilder, UsageSummary, UsageTotals,
};
pub use request::{GenerationOutcome, GenerationRequest, GenerationRequestBuilder, StepOutcome};
