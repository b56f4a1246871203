// src/lib.rs

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod store;
pub mod task;
pub mod types;

pub use bootstrap::Bootstrap;
pub use engine::{InitScheduler, RunReport};
pub use errors::{InitError, TaskError};
pub use store::{ReadinessStore, Subscription, TaskState};
pub use task::{InitTask, TaskContext};

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading (and `--wiring` override)
/// - bootstrap graph registration
/// - readiness logging
/// - the initial run plus any requested refreshes
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = config::resolve(args.config.as_deref().map(Path::new))?;
    if let Some(wiring) = args.wiring {
        cfg.settings.wiring = wiring;
    }

    let bootstrap = Bootstrap::new(&cfg)?;

    if args.dry_run {
        print_dry_run(&bootstrap, &cfg)?;
        return Ok(());
    }

    // Log every transition; the subscriptions live until `run` returns.
    let mut subscriptions = Vec::new();
    for name in bootstrap.store().task_names() {
        let task = name.clone();
        subscriptions.push(bootstrap.store().subscribe(&name, move |state| {
            debug!(task = %task, state = state.label(), "readiness changed");
        })?);
    }

    let mut ready_rx = bootstrap.watch_all_ready();
    tokio::spawn(async move {
        while ready_rx.changed().await.is_ok() {
            let all_ready = *ready_rx.borrow_and_update();
            info!(all_ready, "application readiness changed");
        }
    });

    let mut report = bootstrap.start().await?;
    for round in 1..=args.refresh {
        info!(round, "refresh requested");
        report = bootstrap.refresh().await?;
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&bootstrap.store().snapshot())?
        );
    } else {
        print_summary(&bootstrap);
    }

    drop(subscriptions);

    if !report.all_succeeded() {
        bail!(
            "{} initialization task(s) failed in run {}",
            report.failed.len(),
            report.run_id
        );
    }
    Ok(())
}

/// Simple dry-run output: print tasks, deps, timeouts and execution order.
fn print_dry_run(bootstrap: &Bootstrap, cfg: &ConfigFile) -> Result<()> {
    let scheduler = bootstrap.scheduler();

    println!("initdag dry-run");
    println!("  settings.wiring = {:?}", cfg.settings.wiring);
    println!("  settings.default_timeout = {:?}", cfg.settings.default_timeout);
    println!();

    println!("tasks ({}):", scheduler.task_names().len());
    for task in scheduler.tasks() {
        let settings = cfg.task_settings(task.name());
        println!("  - {}", task.name());
        if !task.deps().is_empty() {
            println!("      after: {:?}", task.deps());
        }
        println!("      delay: {:?}", settings.delay);
        if let Some(timeout) = task.timeout_limit() {
            println!("      timeout: {:?}", timeout);
        }
        if settings.fail {
            println!("      fail: true");
        }
    }
    println!();

    println!("execution order: {}", scheduler.execution_order()?.join(" -> "));

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(bootstrap: &Bootstrap) {
    println!("initialization results:");
    for (name, state) in bootstrap.store().snapshot() {
        match state {
            TaskState::Completed(output) => println!("  {name}: completed {output}"),
            TaskState::Failed(err) => println!("  {name}: failed ({err})"),
            other => println!("  {name}: {}", other.label()),
        }
    }
    println!("all ready: {}", bootstrap.all_ready());
}
