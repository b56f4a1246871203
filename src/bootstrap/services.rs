// src/bootstrap/services.rs

//! The application's three initialization services.
//!
//! Each action simulates its latency with a sleep, then produces a JSON
//! document. Dependency outputs are taken from the task context when the
//! edge is declared. Under the parallel wiring there is no edge, so the
//! action falls back to whatever the readiness store holds at that moment
//! and logs an error when the dependency is not ready yet.

use anyhow::bail;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::config::ConfigFile;
use crate::task::{InitTask, TaskContext};
use crate::types::{TaskOutput, Wiring};

use super::{CONFIG_TASK, FEATURE_FLAGS_TASK, PREFERENCES_TASK};

/// `itemsPerPage` used by `preferences` when config is unavailable.
pub const FALLBACK_ITEMS_PER_PAGE: u64 = 10;

/// `maxWidgets` used by `feature-flags` when preferences are unavailable.
pub const FALLBACK_MAX_WIDGETS: u64 = 20;

/// Build the bootstrap tasks with the edges `wiring` calls for.
pub fn build_tasks(cfg: &ConfigFile) -> Vec<InitTask> {
    let wiring = cfg.settings.wiring;

    let mut preferences = preferences_task(cfg);
    let mut feature_flags = feature_flags_task(cfg);

    if wiring == Wiring::Ordered {
        preferences = preferences.after(CONFIG_TASK);
        feature_flags = feature_flags.after(CONFIG_TASK).after(PREFERENCES_TASK);
    }

    [config_task(cfg), preferences, feature_flags]
        .into_iter()
        .map(|task| match cfg.effective_timeout(task.name()) {
            Some(limit) => task.timeout(limit),
            None => task,
        })
        .collect()
}

fn config_task(cfg: &ConfigFile) -> InitTask {
    let settings = cfg.task_settings(CONFIG_TASK);
    let api_url = cfg.settings.api_url.clone();
    let items_per_page = cfg.settings.items_per_page;

    InitTask::new(CONFIG_TASK, move |ctx: TaskContext| {
        let settings = settings.clone();
        let api_url = api_url.clone();
        async move {
            info!(task = %ctx.name(), "loading base configuration");
            tokio::time::sleep(settings.delay).await;

            if settings.fail {
                bail!("configuration endpoint unavailable");
            }

            info!(task = %ctx.name(), "configuration loaded");
            Ok(json!({
                "apiUrl": api_url,
                "apiTimeout": 5000,
                "enableAnalytics": true,
                "theme": "light",
                "itemsPerPage": items_per_page,
            }))
        }
    })
}

fn preferences_task(cfg: &ConfigFile) -> InitTask {
    let settings = cfg.task_settings(PREFERENCES_TASK);

    InitTask::new(PREFERENCES_TASK, move |ctx: TaskContext| {
        let settings = settings.clone();
        async move {
            info!(task = %ctx.name(), "loading user preferences");

            let config = read_dependency(&ctx, CONFIG_TASK);
            let items_per_page = config
                .as_deref()
                .and_then(|c| c.get("itemsPerPage"))
                .and_then(Value::as_u64)
                .unwrap_or(FALLBACK_ITEMS_PER_PAGE);

            tokio::time::sleep(settings.delay).await;

            if settings.fail {
                bail!("preferences endpoint unavailable");
            }

            info!(task = %ctx.name(), "preferences loaded");
            Ok(json!({
                "language": "en",
                "notifications": true,
                "dashboardLayout": "grid",
                "itemsPerPage": items_per_page,
            }))
        }
    })
}

fn feature_flags_task(cfg: &ConfigFile) -> InitTask {
    let settings = cfg.task_settings(FEATURE_FLAGS_TASK);

    InitTask::new(FEATURE_FLAGS_TASK, move |ctx: TaskContext| {
        let settings = settings.clone();
        async move {
            info!(task = %ctx.name(), "loading feature flags");

            let config = read_dependency(&ctx, CONFIG_TASK);
            let preferences = read_dependency(&ctx, PREFERENCES_TASK);

            let enable_analytics = config
                .as_deref()
                .and_then(|c| c.get("enableAnalytics"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let notifications = preferences
                .as_deref()
                .and_then(|p| p.get("notifications"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let max_widgets = preferences
                .as_deref()
                .and_then(|p| p.get("itemsPerPage"))
                .and_then(Value::as_u64)
                .map(|n| n * 2)
                .unwrap_or(FALLBACK_MAX_WIDGETS);

            tokio::time::sleep(settings.delay).await;

            if settings.fail {
                bail!("feature flag endpoint unavailable");
            }

            info!(task = %ctx.name(), "feature flags loaded");
            Ok(json!({
                "enableNewDashboard": enable_analytics && notifications,
                "enableBetaFeatures": false,
                "enableAdvancedCharts": true,
                "maxWidgets": max_widgets,
            }))
        }
    })
}

/// Output of `dependency` as seen by the running task.
///
/// A declared dependency is always available from the context. Otherwise the
/// store is read as-is, which is exactly the race the ordered wiring removes.
fn read_dependency(ctx: &TaskContext, dependency: &str) -> Option<TaskOutput> {
    if let Some(output) = ctx.dependency(dependency) {
        info!(task = %ctx.name(), dependency, "dependency is ready");
        return Some(output.clone());
    }

    match ctx.store().get(dependency) {
        Some(state) if state.is_completed() => state.output().cloned(),
        Some(state) => {
            error!(
                task = %ctx.name(),
                dependency,
                state = state.label(),
                "dependency not ready; falling back to defaults"
            );
            None
        }
        None => {
            error!(task = %ctx.name(), dependency, "dependency is not registered");
            None
        }
    }
}
