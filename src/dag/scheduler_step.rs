// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::types::TaskName;

/// A dependent that was failed because something upstream failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    pub task: TaskName,
    /// The dependency whose failure blocked `task`.
    pub failed_dependency: TaskName,
}

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Transitive dependents newly marked as failed in this step. The task
    /// that failed on its own is not included.
    pub newly_blocked: Vec<BlockedTask>,
    /// Whether this step settled the last task of the run (i.e. the
    /// scheduler is now idle).
    pub run_just_finished: bool,
}
