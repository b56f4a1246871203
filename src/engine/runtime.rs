// src/engine/runtime.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{BlockedTask, ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::errors::{InitError, Result, TaskError};
use crate::exec::run_task;
use crate::store::{ReadinessStore, TaskState};
use crate::task::{InitTask, TaskContext};
use crate::types::{TaskName, TaskOutput};

use super::{RuntimeEvent, TaskOutcome};

/// Summary of one settled run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: u64,
    /// Tasks that completed, in completion order.
    pub completed: Vec<TaskName>,
    /// Tasks that failed (on their own or through a dependency), in the
    /// order they failed.
    pub failed: Vec<(TaskName, TaskError)>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn error_of(&self, task: &str) -> Option<&TaskError> {
        self.failed
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, err)| err)
    }
}

/// Drives one initialization run.
///
/// The pure [`Scheduler`] decides what may run; this shell publishes every
/// transition to the [`ReadinessStore`], spawns ready actions through
/// [`run_task`] and feeds their settlement back into the scheduler. It is
/// the only writer of the store while the run is active.
pub struct Runtime {
    scheduler: Scheduler,
    tasks: Arc<BTreeMap<TaskName, InitTask>>,
    store: ReadinessStore,
    run_id: u64,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    outputs: HashMap<TaskName, TaskOutput>,
    report: RunReport,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        scheduler: Scheduler,
        tasks: Arc<BTreeMap<TaskName, InitTask>>,
        store: ReadinessStore,
        run_id: u64,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(tasks.len().max(1) * 2);
        Self {
            scheduler,
            tasks,
            store,
            run_id,
            event_tx,
            event_rx,
            outputs: HashMap::new(),
            report: RunReport {
                run_id,
                ..RunReport::default()
            },
        }
    }

    /// Main event loop.
    ///
    /// - Starts the run and dispatches the roots.
    /// - Consumes `RuntimeEvent`s until every task has settled.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(run_id = self.run_id, tasks = self.tasks.len(), "init run started");

        let step = self.scheduler.start_run(self.run_id);
        self.apply_step(step);

        while !self.scheduler.is_idle() {
            let Some(event) = self.event_rx.recv().await else {
                warn!(run_id = self.run_id, "runtime event channel closed; exiting");
                return Err(InitError::Other(anyhow::anyhow!(
                    "runtime event channel closed before run {} settled",
                    self.run_id
                )));
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskSettled {
                    task,
                    run_id,
                    result,
                } => {
                    if run_id != self.run_id {
                        warn!(
                            task = %task,
                            run_id,
                            current_run = self.run_id,
                            "settlement from another run; ignoring"
                        );
                        continue;
                    }
                    self.handle_settled(task, result);
                }
            }
        }

        info!(
            run_id = self.run_id,
            completed = self.report.completed.len(),
            failed = self.report.failed.len(),
            "init run settled"
        );
        Ok(self.report)
    }

    fn handle_settled(&mut self, task: TaskName, result: std::result::Result<TaskOutput, TaskError>) {
        if self.scheduler.run_state_of(&task) != Some(TaskRunState::Running) {
            warn!(task = %task, "duplicate or unexpected settlement; ignoring");
            return;
        }

        // The terminal state is published before any dependent is scheduled,
        // so a dependent's action always observes its dependencies Completed.
        let outcome = match result {
            Ok(output) => {
                info!(task = %task, run_id = self.run_id, "task completed");
                self.store
                    .publish(&task, TaskState::Completed(Arc::clone(&output)));
                self.outputs.insert(task.clone(), output);
                self.report.completed.push(task.clone());
                TaskOutcome::Success
            }
            Err(err) => {
                warn!(task = %task, run_id = self.run_id, error = %err, "task failed");
                self.store.publish(&task, TaskState::Failed(err.clone()));
                self.report.failed.push((task.clone(), err));
                TaskOutcome::Failed
            }
        };

        let step = self.scheduler.handle_completion(&task, outcome);
        self.apply_step(step);
    }

    fn apply_step(&mut self, step: SchedulerStep) {
        for BlockedTask {
            task,
            failed_dependency,
        } in step.newly_blocked
        {
            let err = TaskError::DependencyFailed {
                task: task.clone(),
                dependency: failed_dependency,
            };
            warn!(task = %task, run_id = self.run_id, error = %err, "task blocked by failed dependency");
            self.store.publish(&task, TaskState::Failed(err.clone()));
            self.report.failed.push((task, err));
        }

        for scheduled in step.newly_scheduled {
            self.dispatch(scheduled);
        }
    }

    fn dispatch(&mut self, scheduled: ScheduledTask) {
        let Some(task) = self.tasks.get(&scheduled.name) else {
            warn!(task = %scheduled.name, "scheduled task has no definition; ignoring");
            return;
        };

        let dependencies: BTreeMap<TaskName, TaskOutput> = scheduled
            .deps
            .iter()
            .filter_map(|dep| {
                self.outputs
                    .get(dep)
                    .map(|output| (dep.clone(), Arc::clone(output)))
            })
            .collect();

        let ctx = TaskContext::new(
            scheduled.name.clone(),
            scheduled.run_id,
            dependencies,
            self.store.clone(),
        );

        self.store.publish(&scheduled.name, TaskState::Running);

        tokio::spawn(run_task(
            scheduled,
            task.action(),
            task.timeout_limit(),
            ctx,
            self.event_tx.clone(),
        ));
    }
}
