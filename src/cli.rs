// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `onsave`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "onsave",
    version,
    about = "Run debounced scripts whenever files in the workspace change.",
    long_about = None
)]
pub struct CliArgs {
    /// Workspace root to watch. `.statusBarTask.json` is looked up here, then
    /// in the parent directory.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub workspace: PathBuf,

    /// Trigger every enabled script once, wait until all runs are done and
    /// exit. Exits non-zero if any script reported errors.
    #[arg(long)]
    pub once: bool,

    /// Parse + validate the configuration, print the scripts, but don't run
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Load a changed configuration without asking for confirmation.
    #[arg(long)]
    pub trust_config: bool,

    /// Extra glob (relative to the workspace) whose changes are ignored.
    /// May be repeated.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ONSAVE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
