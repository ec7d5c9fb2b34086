//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the sitesmith binary.

mod commands;
mod generate;
mod logs;
mod maintenance;
mod projects;

pub use commands::{Cli, Commands};
pub use generate::run_generate;
pub use logs::handle_log_command;
pub use maintenance::{list_providers, run_cleanup, show_usage};
pub use projects::handle_project_command;
