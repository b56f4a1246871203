// src/bootstrap/mod.rs

//! Application bootstrap.
//!
//! Declares the concrete initialization graph
//!
//! ```text
//! config ──▶ preferences ──▶ feature-flags
//!    └───────────────────────────▲
//! ```
//!
//! registers it with an [`InitScheduler`] and runs it once at start-up.
//! [`Bootstrap::all_ready`] is the single readiness signal for the rest of
//! the application.

pub mod services;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::info;

use crate::config::ConfigFile;
use crate::engine::{InitScheduler, RunReport};
use crate::errors::{InitError, Result};
use crate::store::ReadinessStore;
use crate::task::InitTask;

pub const CONFIG_TASK: &str = "config";
pub const PREFERENCES_TASK: &str = "preferences";
pub const FEATURE_FLAGS_TASK: &str = "feature-flags";

/// Owns the scheduler and its readiness store for the application's lifetime.
#[derive(Debug)]
pub struct Bootstrap {
    scheduler: Arc<InitScheduler>,
    started: AtomicBool,
}

impl Bootstrap {
    /// Register the bootstrap services described by `cfg`.
    pub fn new(cfg: &ConfigFile) -> Result<Self> {
        info!(wiring = ?cfg.settings.wiring, "declaring bootstrap graph");
        Self::from_tasks(services::build_tasks(cfg))
    }

    /// Register an arbitrary task set.
    ///
    /// Any registration or validation error aborts the whole bootstrap; no
    /// partial graph is ever run.
    pub fn from_tasks(tasks: impl IntoIterator<Item = InitTask>) -> Result<Self> {
        let mut scheduler = InitScheduler::new();
        for task in tasks {
            scheduler.register(task)?;
        }
        scheduler.validate()?;

        Ok(Self {
            scheduler: Arc::new(scheduler),
            started: AtomicBool::new(false),
        })
    }

    /// Shared handle to the scheduler, e.g. for `await_task`.
    pub fn scheduler(&self) -> Arc<InitScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn store(&self) -> &ReadinessStore {
        self.scheduler.store()
    }

    /// Run initialization. Allowed exactly once; use
    /// [`refresh`](Self::refresh) afterwards.
    pub async fn start(&self) -> Result<RunReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(InitError::AlreadyStarted);
        }
        info!(tasks = ?self.scheduler.task_names(), "starting initialization");
        self.scheduler.run_all().await
    }

    /// Re-run initialization in dependency order.
    pub async fn refresh(&self) -> Result<RunReport> {
        self.started.store(true, Ordering::SeqCst);
        self.scheduler.refresh().await
    }

    /// `true` iff every registered task is `Completed`.
    pub fn all_ready(&self) -> bool {
        self.store().all_ready()
    }

    /// Receiver that changes whenever [`all_ready`](Self::all_ready) does.
    pub fn watch_all_ready(&self) -> watch::Receiver<bool> {
        self.store().watch_all_ready()
    }
}
