use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Settled output of an initialization task.
///
/// Shared behind an `Arc` so every observer and every `await_task` caller
/// sees the single recorded result.
pub type TaskOutput = Arc<serde_json::Value>;

/// How the bootstrap graph declares its dependency edges.
///
/// - `Ordered`: `preferences` waits for `config`, `feature-flags` waits for
///   both (default behaviour).
/// - `Parallel`: no edges are declared, so all three tasks start at once and
///   read each other's state before it has settled. This reproduces the race
///   the ordered wiring fixes and is only useful for demonstrations and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Wiring {
    #[default]
    Ordered,
    Parallel,
}

/// Parse a duration string such as `"800ms"`, `"3s"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{}'", s))
}
