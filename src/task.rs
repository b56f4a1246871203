// src/task.rs

//! Task definitions handed to the [`InitScheduler`](crate::engine::InitScheduler).

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::store::ReadinessStore;
use crate::types::{TaskName, TaskOutput};

/// Boxed future returned by a task action.
pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<serde_json::Value>> + Send>>;

/// The asynchronous work behind a task.
pub type TaskAction = Arc<dyn Fn(TaskContext) -> TaskFuture + Send + Sync>;

/// A named unit of asynchronous initialization work.
///
/// The action is invoked at most once per run, and only after every task
/// listed in `deps` has completed successfully.
#[derive(Clone)]
pub struct InitTask {
    name: TaskName,
    deps: Vec<TaskName>,
    timeout: Option<Duration>,
    action: TaskAction,
}

impl InitTask {
    pub fn new<F, Fut>(name: impl Into<TaskName>, action: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            deps: Vec::new(),
            timeout: None,
            action: Arc::new(move |ctx| -> TaskFuture { Box::pin(action(ctx)) }),
        }
    }

    /// Declare that this task must run after `dep` has completed.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        let dep = dep.into();
        if !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
        self
    }

    /// Stop waiting for the action after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.deps
    }

    pub fn timeout_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn action(&self) -> TaskAction {
        Arc::clone(&self.action)
    }
}

impl fmt::Debug for InitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitTask")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// What a running action can see.
///
/// `dependencies` holds the outputs of the task's declared dependencies, all
/// of which are `Completed` by the time the action starts.
#[derive(Debug, Clone)]
pub struct TaskContext {
    name: TaskName,
    run_id: u64,
    dependencies: BTreeMap<TaskName, TaskOutput>,
    store: ReadinessStore,
}

impl TaskContext {
    pub(crate) fn new(
        name: TaskName,
        run_id: u64,
        dependencies: BTreeMap<TaskName, TaskOutput>,
        store: ReadinessStore,
    ) -> Self {
        Self {
            name,
            run_id,
            dependencies,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Output of a declared dependency.
    pub fn dependency(&self, name: &str) -> Option<&TaskOutput> {
        self.dependencies.get(name)
    }

    pub fn dependencies(&self) -> &BTreeMap<TaskName, TaskOutput> {
        &self.dependencies
    }

    /// Read-only access to the readiness store.
    pub fn store(&self) -> &ReadinessStore {
        &self.store
    }
}
