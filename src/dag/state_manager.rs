// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::scheduler_step::BlockedTask;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::types::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Put every task back to `Pending` with its full in-degree.
    pub fn mark_all_pending(&mut self) {
        for info in self.tasks.values_mut() {
            info.run_state = Some(RunState::Pending);
            info.unresolved_deps = info.deps.len();
        }
    }

    /// Record that `done` completed: decrement the in-degree of each of its
    /// dependents.
    pub fn release_dependents(&mut self, done: &str) {
        for dependent in self.graph.dependents_of(done) {
            if let Some(info) = self.tasks.get_mut(dependent) {
                if info.unresolved_deps == 0 {
                    warn!(
                        task = %info.name,
                        dep = %done,
                        "in-degree already zero while releasing dependent"
                    );
                    continue;
                }
                info.unresolved_deps -= 1;
                debug!(
                    task = %info.name,
                    dep = %done,
                    remaining = info.unresolved_deps,
                    "dependency completed"
                );
            }
        }
    }

    /// Mark all `Pending` transitive dependents of a failed task as
    /// `DoneFailed` for this run.
    ///
    /// Returns each newly failed task together with the dependency whose
    /// failure reached it.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<BlockedTask> {
        let mut stack: Vec<(TaskName, TaskName)> = self
            .graph
            .dependents_of(failed_task)
            .iter()
            .map(|dependent| (dependent.clone(), failed_task.to_string()))
            .collect();

        let mut newly_blocked = Vec::new();

        while let Some((name, cause)) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };

            match info.run_state {
                Some(RunState::Pending) => {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        task = %info.name,
                        dep = %cause,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_blocked.push(BlockedTask {
                        task: info.name.clone(),
                        failed_dependency: cause,
                    });
                    stack.extend(
                        self.graph
                            .dependents_of(&name)
                            .iter()
                            .map(|dependent| (dependent.clone(), name.clone())),
                    );
                }
                Some(RunState::Running) => {
                    // A running task has all deps completed, so an upstream
                    // failure can never reach it.
                    warn!(
                        task = %info.name,
                        dep = %cause,
                        "running task reached by upstream failure; leaving it alone"
                    );
                }
                Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => {}
            }
        }

        newly_blocked
    }

    /// Collect tasks that are `Pending` with no unresolved dependencies, mark
    /// them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending)) && info.unresolved_deps == 0
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let run_id = self.current_run_id.unwrap_or(0);
        let mut ready = Vec::with_capacity(candidates.len());

        for name in candidates {
            debug_assert!(
                ReadOnlyStateManager::new(self.tasks).deps_satisfied(&name),
                "in-degree reached zero before every dependency completed"
            );

            if let Some(info) = self.tasks.get_mut(&name) {
                info!(
                    task = %info.name,
                    run_id,
                    deps = ?info.deps,
                    "dependencies satisfied; scheduling task"
                );
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(info, run_id));
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(TaskInfo::is_terminal)
    }
}

/// A read-only view used when only shared access to the tasks map is
/// available (e.g. in `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Whether every dependency of `task` is `DoneSuccess` in the current run.
    ///
    /// This checks the states directly rather than the in-degree counter, so
    /// it can be used to cross-check the counter.
    pub fn deps_satisfied(&self, task: &str) -> bool {
        let Some(info) = self.tasks.get(task) else {
            return false;
        };

        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => matches!(dep.run_state, Some(RunState::DoneSuccess)),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
