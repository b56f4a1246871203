// src/exec/task_runner.rs

//! Individual task action runner.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::TaskError;
use crate::task::{TaskAction, TaskContext};
use crate::types::TaskOutput;

/// Run a single task action and emit exactly one `TaskSettled` event.
///
/// The action runs in its own Tokio task. When `timeout` elapses first, the
/// runner stops waiting and reports `TaskError::Timeout`; the action itself
/// is detached, not aborted, and its eventual result is discarded.
pub async fn run_task(
    task: ScheduledTask,
    action: TaskAction,
    timeout: Option<Duration>,
    ctx: TaskContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let task_name = task.name.clone();
    let run_id = task.run_id;

    let result = run_task_inner(&task, action, timeout, ctx).await;

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskSettled {
            task: task_name.clone(),
            run_id,
            result,
        })
        .await
    {
        error!(
            task = %task_name,
            run_id,
            error = %err,
            "failed to report task settlement to runtime"
        );
    }
}

async fn run_task_inner(
    task: &ScheduledTask,
    action: TaskAction,
    timeout: Option<Duration>,
    ctx: TaskContext,
) -> Result<TaskOutput, TaskError> {
    info!(
        task = %task.name,
        run_id = task.run_id,
        ?timeout,
        "starting init task"
    );

    let handle = tokio::spawn((*action)(ctx));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                // Dropping the JoinHandle detaches the action; it keeps running.
                warn!(
                    task = %task.name,
                    run_id = task.run_id,
                    ?limit,
                    "task timed out; no longer waiting for it"
                );
                return Err(TaskError::Timeout {
                    task: task.name.clone(),
                    timeout: limit,
                });
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(value)) => {
            debug!(task = %task.name, run_id = task.run_id, "task action returned a value");
            Ok(Arc::new(value))
        }
        Ok(Err(err)) => Err(TaskError::Execution {
            task: task.name.clone(),
            message: format!("{err:#}"),
        }),
        Err(join_err) => Err(TaskError::Execution {
            task: task.name.clone(),
            message: describe_join_error(join_err),
        }),
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("action panicked: {}", panic_message(err.into_panic()))
    } else {
        format!("action was cancelled: {err}")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
