// src/exec/mod.rs

//! Action execution layer.
//!
//! [`task_runner`] runs one task's action in its own Tokio task, applies the
//! optional timeout, converts errors and panics into [`TaskError`]s and
//! reports the result back to the engine runtime as a `RuntimeEvent`.
//!
//! [`TaskError`]: crate::errors::TaskError

pub mod task_runner;

pub use task_runner::run_task;
