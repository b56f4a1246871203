use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use initdag::store::TaskState;
use initdag::task::{InitTask, TaskContext};
use initdag::types::{TaskName, TaskOutput};
use serde_json::Value;

/// What a probe task saw when its action started.
#[derive(Debug, Clone)]
pub struct Observation {
    pub task: TaskName,
    pub run_id: u64,
    /// Whole-store snapshot taken as the action started.
    pub store: BTreeMap<TaskName, TaskState>,
    /// Dependency outputs handed to the action.
    pub dependencies: BTreeMap<TaskName, TaskOutput>,
}

impl Observation {
    /// State of `task` in the snapshot.
    pub fn state_of(&self, task: &str) -> Option<&TaskState> {
        self.store.get(task)
    }
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<TaskName>,
    observations: Vec<Observation>,
}

/// Builds tasks that record every invocation.
///
/// Clones share the same records, so one probe can back many tasks.
#[derive(Clone, Default)]
pub struct TaskProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl TaskProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task that returns `output` after 10ms.
    pub fn succeed(&self, name: &str, output: Value) -> InitTask {
        self.succeed_after(name, Duration::from_millis(10), output)
    }

    /// A task that returns `output` after `delay`.
    pub fn succeed_after(&self, name: &str, delay: Duration, output: Value) -> InitTask {
        let probe = self.clone();
        InitTask::new(name, move |ctx: TaskContext| {
            let probe = probe.clone();
            let output = output.clone();
            async move {
                probe.record(&ctx);
                tokio::time::sleep(delay).await;
                anyhow::Ok(output)
            }
        })
    }

    /// A task that fails with `message` after 10ms.
    pub fn fail(&self, name: &str, message: &str) -> InitTask {
        let probe = self.clone();
        let message = message.to_string();
        InitTask::new(name, move |ctx: TaskContext| {
            let probe = probe.clone();
            let message = message.clone();
            async move {
                probe.record(&ctx);
                tokio::time::sleep(Duration::from_millis(10)).await;
                let result: anyhow::Result<Value> = Err(anyhow::anyhow!(message));
                result
            }
        })
    }

    /// A task that panics with `message`.
    pub fn panic(&self, name: &str, message: &'static str) -> InitTask {
        let probe = self.clone();
        InitTask::new(name, move |ctx: TaskContext| {
            let probe = probe.clone();
            async move {
                probe.record(&ctx);
                if !message.is_empty() {
                    panic!("{}", message);
                }
                anyhow::Ok(Value::Null)
            }
        })
    }

    /// Names of invoked tasks, in invocation order.
    pub fn calls(&self) -> Vec<TaskName> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    /// Observations recorded by `name`, oldest first.
    pub fn observations_of(&self, name: &str) -> Vec<Observation> {
        self.state
            .lock()
            .unwrap()
            .observations
            .iter()
            .filter(|o| o.task == name)
            .cloned()
            .collect()
    }

    /// The first observation recorded by `name`.
    pub fn observation(&self, name: &str) -> Option<Observation> {
        self.observations_of(name).into_iter().next()
    }

    fn record(&self, ctx: &TaskContext) {
        let observation = Observation {
            task: ctx.name().to_string(),
            run_id: ctx.run_id(),
            store: ctx.store().snapshot(),
            dependencies: ctx.dependencies().clone(),
        };
        let mut state = self.state.lock().unwrap();
        state.calls.push(ctx.name().to_string());
        state.observations.push(observation);
    }
}
