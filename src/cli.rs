// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::TransportMode;

/// Command-line arguments for `pipewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipewatch",
    version,
    about = "Trigger and follow a remote batch pipeline run step by step.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `pipewatch.toml` in the current working directory; if that
    /// file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Backend base URL (overrides `[dashboard].backend_url`).
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Transport used to follow a run (overrides `[dashboard].transport`).
    #[arg(long, value_name = "MODE", value_parser = parse_transport)]
    pub transport: Option<TransportMode>,

    /// Ask the backend to run the pipeline starting from this step.
    #[arg(long, value_name = "STEP")]
    pub start_step: Option<String>,

    /// Clear the backend's run history before anything else.
    #[arg(long)]
    pub clear_history: bool,

    /// Exit once the requested run has settled (or right after the initial
    /// render if no run was requested).
    #[arg(long)]
    pub once: bool,

    /// Print the backend's pipeline configuration and exit.
    #[arg(long)]
    pub show_backend_config: bool,

    /// Set a backend configuration value (repeatable) and exit.
    #[arg(long, value_name = "KEY=VALUE")]
    pub set_backend_config: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print the step list, but don't contact the
    /// backend.
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

fn parse_transport(s: &str) -> Result<TransportMode, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
