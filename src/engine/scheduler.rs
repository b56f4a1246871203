// src/engine/scheduler.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{debug, info};

use crate::dag::{DagGraph, Scheduler};
use crate::errors::{InitError, Result};
use crate::store::ReadinessStore;
use crate::task::InitTask;
use crate::types::{TaskName, TaskOutput};

use super::runtime::{RunReport, Runtime};

/// Runs registered [`InitTask`]s in dependency order.
///
/// Register every task first (`&mut self`), then share the scheduler
/// (e.g. behind an `Arc`): [`run_all`](Self::run_all),
/// [`await_task`](Self::await_task) and [`is_ready`](Self::is_ready) all take
/// `&self` and may be used concurrently.
#[derive(Debug)]
pub struct InitScheduler {
    tasks: BTreeMap<TaskName, InitTask>,
    store: ReadinessStore,
    run_counter: AtomicU64,
    in_flight: AtomicBool,
}

impl Default for InitScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl InitScheduler {
    pub fn new() -> Self {
        Self::with_store(ReadinessStore::new())
    }

    /// Build a scheduler that publishes into an existing store.
    pub fn with_store(store: ReadinessStore) -> Self {
        Self {
            tasks: BTreeMap::new(),
            store,
            run_counter: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &ReadinessStore {
        &self.store
    }

    /// Registered tasks, sorted by name.
    pub fn tasks(&self) -> impl Iterator<Item = &InitTask> {
        self.tasks.values()
    }

    pub fn task_names(&self) -> Vec<TaskName> {
        self.tasks.keys().cloned().collect()
    }

    /// Add a task definition and give it a `Pending` entry in the store.
    ///
    /// Dependencies may name tasks that are registered later; those are
    /// checked by [`validate`](Self::validate). A registration that would
    /// close a cycle among already-registered tasks is rejected and leaves
    /// no trace.
    pub fn register(&mut self, task: InitTask) -> Result<()> {
        if self.tasks.contains_key(task.name()) {
            return Err(InitError::DuplicateTask(task.name().to_string()));
        }

        DagGraph::from_tasks(self.tasks.values().chain(std::iter::once(&task))).check_acyclic()?;

        debug!(task = %task.name(), deps = ?task.deps(), timeout = ?task.timeout_limit(), "registered init task");
        self.store.insert_pending(task.name());
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Finalize the graph: every dependency must be registered and the graph
    /// must be acyclic.
    pub fn validate(&self) -> Result<()> {
        let graph = DagGraph::from_tasks(self.tasks.values());
        graph.validate_dependencies()?;
        graph.check_acyclic()
    }

    /// One valid execution order, dependencies first.
    pub fn execution_order(&self) -> Result<Vec<TaskName>> {
        let graph = DagGraph::from_tasks(self.tasks.values());
        graph.validate_dependencies()?;
        graph.topological_order()
    }

    /// Run every registered task to settlement, honouring dependencies.
    ///
    /// Resolves once every task is `Completed` or `Failed`; a failed task
    /// fails its transitive dependents without running them. Calling this
    /// again after a run settled re-initializes everything (see
    /// [`refresh`](Self::refresh)). Fails with [`InitError::RunInProgress`]
    /// while another run is in flight, and with a registration error (before
    /// anything runs) if the graph is invalid.
    pub async fn run_all(&self) -> Result<RunReport> {
        let _guard = RunGuard::acquire(&self.in_flight)?;

        self.validate()?;

        let run_id = self.run_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.reset_to_pending();

        let graph = DagGraph::from_tasks(self.tasks.values());
        let runtime = Runtime::new(
            Scheduler::new(graph),
            Arc::new(self.tasks.clone()),
            self.store.clone(),
            run_id,
        );

        runtime.run().await
    }

    /// Re-run initialization from scratch, in dependency order.
    pub async fn refresh(&self) -> Result<RunReport> {
        info!(tasks = self.tasks.len(), "refreshing initialization");
        self.run_all().await
    }

    /// Wait until `task` settles and return its recorded result.
    ///
    /// Every caller gets the same `Arc`'d output (or the same error); waiting
    /// never triggers execution.
    pub async fn await_task(&self, task: &str) -> Result<TaskOutput> {
        let mut rx = self.store.watch(task)?;

        let settled = rx
            .wait_for(|state| state.is_settled())
            .await
            .map_err(|_| {
                InitError::Other(anyhow::anyhow!(
                    "readiness store dropped while waiting for task '{}'",
                    task
                ))
            })?
            .settled_result();

        match settled {
            Some(Ok(output)) => Ok(output),
            Some(Err(err)) => Err(InitError::TaskFailed(err)),
            None => Err(InitError::Other(anyhow::anyhow!(
                "task '{}' reported settled without a result",
                task
            ))),
        }
    }

    /// Non-blocking: `true` iff `task` is `Completed`.
    pub fn is_ready(&self, task: &str) -> bool {
        self.store.is_completed(task)
    }

    /// `true` while a run is in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Marks a run as in flight for as long as it is alive.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| InitError::RunInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
