// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the pure DAG scheduler (`crate::dag`)
//! - the task runner that executes actions (`crate::exec`)
//! - the readiness store that every state transition is published to
//!
//! [`runtime`] is the async shell that drives one run; [`scheduler`] holds
//! the public [`InitScheduler`] facade.

use crate::errors::TaskError;
use crate::types::TaskOutput;

pub use crate::types::TaskName;

/// Outcome of a task for the pure scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Events flowing into the runtime from task runners.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched task reached a terminal result.
    TaskSettled {
        task: TaskName,
        run_id: u64,
        result: Result<TaskOutput, TaskError>,
    },
}

pub mod runtime;
pub mod scheduler;

pub use runtime::{RunReport, Runtime};
pub use scheduler::InitScheduler;
