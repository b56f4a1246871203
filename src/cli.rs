// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Wiring;

/// Command-line arguments for `initdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "initdag",
    version,
    about = "Run the application's initialization tasks in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// Default: `Initdag.toml` in the current working directory if it
    /// exists, built-in defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Override `[settings].wiring`.
    ///
    /// `parallel` drops the dependency edges and reproduces the start-up race.
    #[arg(long, value_enum, value_name = "WIRING")]
    pub wiring: Option<Wiring>,

    /// Re-run initialization this many times after the first run.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub refresh: u32,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `INITDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the graph and print the execution order, but run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final readiness snapshot as JSON on stdout.
    #[arg(long)]
    pub json: bool,
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
