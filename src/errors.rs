// src/errors.rs

//! Crate-wide error types.
//!
//! Two families live here:
//! - [`InitError`]: setup-time and API errors (registration, graph
//!   validation, configuration, misuse of the scheduler).
//! - [`TaskError`]: run-time failures recorded against a single task. These
//!   are stored in the readiness store and handed to every observer, so they
//!   are `Clone`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Duplicate task: '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("Unknown dependency: task '{task}' depends on unregistered task '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("An initialization run is already in progress")]
    RunInProgress,

    #[error("Bootstrap has already been started")]
    AlreadyStarted,

    #[error(transparent)]
    TaskFailed(#[from] TaskError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a single task ended in `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskError {
    /// The task's own action returned an error or panicked.
    #[error("task '{task}' failed: {message}")]
    Execution { task: TaskName, message: String },

    /// The task did not settle within its configured timeout.
    #[error("task '{task}' timed out after {timeout:?}")]
    Timeout { task: TaskName, timeout: Duration },

    /// An upstream dependency failed, so the task was never started.
    #[error("task '{task}' was not started: dependency '{dependency}' failed")]
    DependencyFailed { task: TaskName, dependency: TaskName },
}

impl TaskError {
    /// Name of the task this error is recorded against.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Execution { task, .. }
            | TaskError::Timeout { task, .. }
            | TaskError::DependencyFailed { task, .. } => task,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, InitError>;
