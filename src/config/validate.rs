// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::model::{
    ConfigFile, RawConfigFile, RawTaskSettings, SettingsSection, TaskSettings,
    bootstrap_task_names,
};
use crate::errors::{InitError, Result};
use crate::types::{TaskName, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::InitError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let settings = validate_settings(&raw)?;
        let task = validate_tasks(&raw)?;
        Ok(ConfigFile::new_unchecked(settings, task))
    }
}

fn validate_settings(cfg: &RawConfigFile) -> Result<SettingsSection> {
    let raw = &cfg.settings;

    // wiring is strongly typed and validated during deserialization.

    if raw.api_url.trim().is_empty() {
        return Err(InitError::ConfigError(
            "[settings].api_url must not be empty".to_string(),
        ));
    }

    if raw.items_per_page == 0 {
        return Err(InitError::ConfigError(
            "[settings].items_per_page must be >= 1 (got 0)".to_string(),
        ));
    }

    let default_timeout = raw
        .default_timeout
        .as_deref()
        .map(|s| parse_timeout("[settings].default_timeout", s))
        .transpose()?;

    Ok(SettingsSection {
        wiring: raw.wiring,
        default_timeout,
        api_url: raw.api_url.clone(),
        items_per_page: raw.items_per_page,
    })
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<BTreeMap<TaskName, TaskSettings>> {
    let known = bootstrap_task_names();

    for name in cfg.task.keys() {
        if !known.contains(&name.as_str()) {
            return Err(InitError::ConfigError(format!(
                "unknown task '{}' in [task.{}]; expected one of {:?}",
                name, name, known
            )));
        }
    }

    let mut tasks = BTreeMap::new();
    for name in known {
        let settings = match cfg.task.get(name) {
            Some(raw) => validate_task(name, raw)?,
            None => TaskSettings::default_for(name),
        };
        tasks.insert(name.to_string(), settings);
    }
    Ok(tasks)
}

fn validate_task(name: &str, raw: &RawTaskSettings) -> Result<TaskSettings> {
    let defaults = TaskSettings::default_for(name);

    let delay = match raw.delay.as_deref() {
        Some(s) => parse_duration(s).map_err(|e| {
            InitError::ConfigError(format!("[task.{}].delay: {}", name, e))
        })?,
        None => defaults.delay,
    };

    let timeout = raw
        .timeout
        .as_deref()
        .map(|s| parse_timeout(&format!("[task.{}].timeout", name), s))
        .transpose()?;

    Ok(TaskSettings {
        delay,
        timeout,
        fail: raw.fail,
    })
}

fn parse_timeout(field: &str, s: &str) -> Result<Duration> {
    let timeout =
        parse_duration(s).map_err(|e| InitError::ConfigError(format!("{}: {}", field, e)))?;
    if timeout.is_zero() {
        return Err(InitError::ConfigError(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(timeout)
}
