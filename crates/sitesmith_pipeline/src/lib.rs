//! Website generation pipeline for Sitesmith.
//!
//! A request flows through the [`Orchestrator`], which owns the project
//! lifecycle and hands the ordered steps of a [`GenerationMode`] to the
//! [`PipelineRunner`]. Each step builds a prompt, asks the
//! [`ProviderRouter`] for a completion (falling back across providers),
//! extracts the artifact and threads it into the next step. The final
//! artifact is checked by the [`BuildValidator`] before it is saved, and
//! every run is recorded by a [`BuildLogger`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod combine;
mod extraction;
mod in_memory;
mod logger;
mod orchestrator;
mod prompts;
mod registry;
mod router;
mod runner;
mod steps;
mod validator;

pub use combine::ArtifactCombiner;
pub use extraction::{ArtifactExtractor, Extraction, ExtractionMethod};
pub use in_memory::InMemoryProjectStore;
pub use logger::{BuildLogger, LiveViewSettings, live_key, new_session_id};
pub use orchestrator::{CleanupAction, DEFAULT_TIMEOUT, FAILURE_CLEANUP, Orchestrator};
pub use registry::{ProviderCheck, ProviderChoice, ProviderDescription, ProviderRegistry};
pub use router::ProviderRouter;
pub use runner::{
    PipelineOutput, PipelinePlan, PipelinePlanBuilder, PipelineRunner, select_steps,
};
pub use steps::{
    ArtifactKind, GenerationMode, PromptBuilder, PromptContext, Step, build_step_prompt,
};
pub use validator::{BuildValidator, MIN_ARTIFACT_LEN, ValidationReport};
