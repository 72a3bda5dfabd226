// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskrun",
    version,
    about = "Run stored task commands in disposable Kubernetes pods, with a local fallback.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$TASKRUN_CONFIG`, else `Taskrun.toml` in the current working
    /// directory. A missing default file means built-in defaults and no
    /// stored tasks.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Execute the stored task with this id (repeatable).
    #[arg(long = "task", value_name = "ID")]
    pub tasks: Vec<String>,

    /// Execute an ad-hoc command instead of a stored task.
    #[arg(long, value_name = "CMD", conflicts_with = "tasks")]
    pub command: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate config and commands, print them, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
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
