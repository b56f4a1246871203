// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::bootstrap::{CONFIG_TASK, FEATURE_FLAGS_TASK, PREFERENCES_TASK};
use crate::types::{TaskName, Wiring};

/// Top-level settings as read from a TOML file, before validation.
///
/// ```toml
/// [settings]
/// wiring = "ordered"
/// default_timeout = "10s"
/// api_url = "https://api.example.com"
/// items_per_page = 25
///
/// [task.config]
/// delay = "1s"
/// timeout = "3s"
///
/// [task."feature-flags"]
/// delay = "500ms"
/// fail = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: RawSettingsSection,

    /// Per-task overrides from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, RawTaskSettings>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettingsSection {
    /// `"ordered"` (default) or `"parallel"`.
    #[serde(default)]
    pub wiring: Wiring,

    /// Timeout applied to tasks that do not set their own.
    #[serde(default)]
    pub default_timeout: Option<String>,

    /// `apiUrl` reported by the `config` task.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `itemsPerPage` reported by the `config` task.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u64,
}

impl Default for RawSettingsSection {
    fn default() -> Self {
        Self {
            wiring: Wiring::default(),
            default_timeout: None,
            api_url: default_api_url(),
            items_per_page: default_items_per_page(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTaskSettings {
    /// Simulated latency of the task's action, e.g. `"800ms"`.
    #[serde(default)]
    pub delay: Option<String>,

    /// Per-task timeout; overrides `settings.default_timeout`.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Make the action fail instead of producing its output.
    #[serde(default)]
    pub fail: bool,
}

/// Validated settings. Build one with `ConfigFile::try_from(raw)` or take
/// [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: SettingsSection,
    /// One entry per bootstrap task, defaults filled in.
    pub task: BTreeMap<TaskName, TaskSettings>,
}

#[derive(Debug, Clone)]
pub struct SettingsSection {
    pub wiring: Wiring,
    pub default_timeout: Option<Duration>,
    pub api_url: String,
    pub items_per_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    pub delay: Duration,
    pub timeout: Option<Duration>,
    pub fail: bool,
}

impl TaskSettings {
    /// Defaults for a bootstrap task: production-like latencies, no timeout.
    pub fn default_for(task: &str) -> Self {
        let delay = match task {
            CONFIG_TASK => Duration::from_millis(1000),
            PREFERENCES_TASK => Duration::from_millis(800),
            FEATURE_FLAGS_TASK => Duration::from_millis(500),
            _ => Duration::ZERO,
        };
        Self {
            delay,
            timeout: None,
            fail: false,
        }
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        task: BTreeMap<TaskName, TaskSettings>,
    ) -> Self {
        Self { settings, task }
    }

    /// Settings for `task`, falling back to its defaults.
    pub fn task_settings(&self, task: &str) -> TaskSettings {
        self.task
            .get(task)
            .cloned()
            .unwrap_or_else(|| TaskSettings::default_for(task))
    }

    /// Effective timeout for `task`: its own, else `settings.default_timeout`.
    pub fn effective_timeout(&self, task: &str) -> Option<Duration> {
        self.task_settings(task)
            .timeout
            .or(self.settings.default_timeout)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let task = bootstrap_task_names()
            .iter()
            .map(|name| (name.to_string(), TaskSettings::default_for(name)))
            .collect();

        Self {
            settings: SettingsSection {
                wiring: Wiring::default(),
                default_timeout: None,
                api_url: default_api_url(),
                items_per_page: default_items_per_page(),
            },
            task,
        }
    }
}

/// Task names a `[task.<name>]` section may use.
pub fn bootstrap_task_names() -> [&'static str; 3] {
    [CONFIG_TASK, PREFERENCES_TASK, FEATURE_FLAGS_TASK]
}

fn default_api_url() -> String {
    "https://api.example.com".to_string()
}

fn default_items_per_page() -> u64 {
    25
}
