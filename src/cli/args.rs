//! CLI argument definitions.
//!
//! All arguments are defined with clap's derive macros; the entry point is
//! the [`Cli`] struct.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Preflight - environment diagnostics before you start work.
#[derive(Debug, Parser)]
#[command(name = "preflight")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration directory (overrides default .preflight)
    #[arg(short, long, global = true, env = "PREFLIGHT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run diagnostics (default if no command specified)
    Run(RunArgs),

    /// List configured projects and profiles
    List(ListArgs),
}

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Projects to check (comma-separated); all configured projects when
    /// omitted
    #[arg(short, long, value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Named profile to apply (e.g. offline, ci)
    #[arg(long)]
    pub profile: Option<String>,

    /// Maximum check groups in flight at once
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            profile: None,
            concurrency: 4,
            format: OutputFormat::Text,
        }
    }
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
