// src/store/state.rs

use serde::Serialize;

use crate::errors::TaskError;
use crate::types::TaskOutput;

/// Lifecycle state of a registered task.
///
/// Transitions are strictly `Pending -> Running -> Completed | Failed` within
/// one run. Tasks failed by an upstream dependency go straight from `Pending`
/// to `Failed`. Only a full re-initialization moves a task back to `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed(TaskOutput),
    Failed(TaskError),
}

impl TaskState {
    /// `true` for `Completed` and `Failed`.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskState::Completed(_) | TaskState::Failed(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskState::Completed(_))
    }

    pub fn output(&self) -> Option<&TaskOutput> {
        match self {
            TaskState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The recorded result of a settled task, or `None` while it is still
    /// `Pending` or `Running`.
    pub fn settled_result(&self) -> Option<Result<TaskOutput, TaskError>> {
        match self {
            TaskState::Completed(output) => Some(Ok(output.clone())),
            TaskState::Failed(err) => Some(Err(err.clone())),
            TaskState::Pending | TaskState::Running => None,
        }
    }

    /// Short lowercase label used in logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed(_) => "completed",
            TaskState::Failed(_) => "failed",
        }
    }
}
