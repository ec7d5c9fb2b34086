//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Sitesmith - multi-provider website generation
#[derive(Parser, Debug)]
#[command(name = "sitesmith")]
#[command(about = "Generate websites from descriptions with multi-provider LLM pipelines", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON-formatted logs
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file used instead of the layered defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a website artifact
    Generate(GenerateArgs),

    /// List configured providers and their pricing
    Providers {
        /// Send a short completion to each provider and report whether it answers
        #[arg(long)]
        check: bool,

        /// Seconds to wait for each provider during --check
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Project commands
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Build log commands
    #[command(subcommand)]
    Log(LogCommands),

    /// Delete build logs and usage records older than the retention period
    Cleanup {
        /// Retention in days (defaults to the configured retention)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show token and cost usage, split by provider and by day
    Usage {
        /// Restrict to one caller
        #[arg(long)]
        owner: Option<String>,

        /// Days covered by the daily breakdown
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

/// Arguments for `generate`
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Natural-language description of the site
    #[arg(long, default_value = "")]
    pub description: String,

    /// Generation mode (full_site, section, layout, theme_builder, divi5_section, divi5_layout)
    #[arg(long)]
    pub mode: Option<String>,

    /// Preferred provider (deepseek, gemini, openai, claude)
    #[arg(long)]
    pub provider: Option<String>,

    /// Run a single step by index (1-5)
    #[arg(long)]
    pub step: Option<u8>,

    /// Regenerate an existing project
    #[arg(long)]
    pub project: Option<Uuid>,

    /// Project name
    #[arg(long)]
    pub name: Option<String>,

    /// Website type tag
    #[arg(long)]
    pub website_type: Option<String>,

    /// Industry tag
    #[arg(long)]
    pub industry: Option<String>,

    /// Caller identity used for ownership and rate limiting
    #[arg(long, default_value = "cli")]
    pub caller: String,

    /// Write the artifact to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Build log subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show one session's build log
    Show {
        /// Session identifier
        session: String,
    },

    /// List the most recent build logs
    Recent {
        /// Maximum number of logs to display
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List projects, most recently updated first
    List {
        /// Restrict to one caller
        #[arg(long)]
        owner: Option<String>,

        /// Restrict to one status (draft, generating, completed, failed)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of projects to display
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Projects skipped before the listing starts
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show one project and its step records
    Show {
        /// Project identifier
        id: Uuid,
    },

    /// Delete a project and its step records
    Delete {
        /// Project identifier
        id: Uuid,
    },
}
