// src/dag/task_info.rs

//! Per-run bookkeeping for the pure scheduler.

use crate::types::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on at least one dependency.
    Pending,
    /// Handed to the runtime for execution.
    Running,
    /// The action completed successfully.
    DoneSuccess,
    /// The action failed, or an upstream dependency failed.
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// No run has been started yet.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static dependency information plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct dependencies.
    pub deps: Vec<TaskName>,
    /// Dependencies that have not completed yet in the current run
    /// (the task's remaining in-degree).
    pub unresolved_deps: usize,
    /// Per-run state (None until the first run starts).
    pub run_state: Option<RunState>,
}

impl TaskInfo {
    pub fn new(name: TaskName, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            unresolved_deps: deps.len(),
            deps,
            run_state: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.run_state,
            Some(RunState::DoneSuccess) | Some(RunState::DoneFailed)
        )
    }
}

/// A task the scheduler wants the runtime to start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Direct dependencies, all `DoneSuccess` at scheduling time.
    pub deps: Vec<TaskName>,
    /// Identifier shared by every task dispatched in the same run.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            deps: info.deps.clone(),
            run_id,
        }
    }
}
