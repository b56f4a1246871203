// src/logging.rs

//! `tracing-subscriber` setup for the `initdag` binary.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `INITDAG_LOG` environment variable (full `EnvFilter` syntax, e.g.
//! `info,initdag::dag=debug`), otherwise `info`. Output goes to stderr so
//! `--json` on stdout stays machine-readable.

use anyhow::Result;
use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding the default filter directives.
pub const LOG_ENV_VAR: &str = "INITDAG_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Resolve the filter from the CLI level and the raw `INITDAG_LOG` value.
///
/// Empty or unparseable env directives fall back to `info`.
pub fn build_filter(cli_level: Option<LogLevel>, env_directives: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level.and_then(|lvl| lvl.to_possible_value()) {
        return EnvFilter::new(level.get_name());
    }

    env_directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
