// src/store/mod.rs

//! Observable readiness state.
//!
//! - [`state`] defines the per-task lifecycle (`TaskState`).
//! - [`readiness`] holds the process-wide [`ReadinessStore`]: one entry per
//!   registered task, written by the engine runtime and read by any number of
//!   observers through snapshots, `watch` receivers or observer callbacks.

pub mod readiness;
pub mod state;

pub use readiness::{ReadinessStore, Subscription};
pub use state::TaskState;
