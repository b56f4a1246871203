use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::TaskOutcome;
use crate::types::TaskName;

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is a pure, synchronous state machine: it performs no IO and knows
/// nothing about Tokio. It is responsible for:
/// - tracking each task's remaining in-degree for the current run
/// - deciding when a task is "ready" (last pending dependency completed)
/// - marking tasks as succeeded/failed
/// - failing transitive dependents when a task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`DagGraph`].
    ///
    /// Assumes every dependency names a task in the graph and that there
    /// are no cycles.
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Whether every dependency of `task` has completed in the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied(task))
    }

    /// Start run `run_id`: every task becomes `Pending`, and tasks without
    /// dependencies are scheduled immediately.
    ///
    /// An empty graph finishes the run in the same step.
    pub fn start_run(&mut self, run_id: u64) -> SchedulerStep {
        if let Some(active) = self.current_run_id {
            warn!(
                active_run = active,
                run_id, "starting a new run while another is active; resetting"
            );
        }

        self.current_run_id = Some(run_id);
        debug!(run_id, tasks = self.tasks.len(), "scheduler: starting new DAG run");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_all_pending();
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_blocked: Vec::new(),
            run_just_finished,
        }
    }

    /// Handle the settlement of a running task.
    ///
    /// Completions for tasks that are not `Running` in the active run are
    /// ignored, so each task settles exactly once.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(
                task = %task,
                "handle_completion called with no active run; ignoring"
            );
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    manager.release_dependents(task);
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
                TaskOutcome::Failed => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(
                        task = %info.name,
                        run_id,
                        "task failed; failing dependents in this run"
                    );
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_blocked = manager.mark_dependents_failed(task);
                }
            },
            Some(info) => {
                warn!(
                    task = %info.name,
                    run_id,
                    state = ?info.run_state,
                    "completion for task that is not running; ignoring"
                );
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// If every task is terminal, end the active run.
    fn maybe_finish_run(&mut self) -> bool {
        let Some(run_id) = self.current_run_id else {
            return false;
        };

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if !manager.all_tasks_terminal() {
            return false;
        }

        let succeeded = self
            .tasks
            .values()
            .filter(|info| info.run_state == Some(RunState::DoneSuccess))
            .count();
        info!(
            run_id,
            succeeded,
            failed = self.tasks.len() - succeeded,
            "DAG run finished"
        );
        self.current_run_id = None;
        true
    }
}
