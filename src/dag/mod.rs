// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] derives dependency/dependent adjacency from registered tasks
//!   and validates it (unknown dependencies, cycles).
//! - [`scheduler`] contains the per-run in-degree state machine that decides
//!   which tasks are ready to run and fails dependents of failed tasks.
//! - [`task_info`] provides per-task run state and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::{BlockedTask, SchedulerStep};
pub use task_info::{ScheduledTask, TaskRunState};
