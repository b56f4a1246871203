use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use initdag::{InitError, InitScheduler, InitTask, TaskContext, TaskError, TaskState};
use initdag_test_utils::probe::TaskProbe;
use initdag_test_utils::{init_tracing, with_timeout};
use serde_json::json;

/// config -> preferences -> feature-flags, with feature-flags also after config.
fn chain(probe: &TaskProbe) -> InitScheduler {
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(probe.succeed_after("config", Duration::from_millis(30), json!({"apiUrl": "x"})))
        .unwrap();
    scheduler
        .register(
            probe
                .succeed("preferences", json!({"theme": "dark"}))
                .after("config"),
        )
        .unwrap();
    scheduler
        .register(
            probe
                .succeed("feature-flags", json!({"beta": true}))
                .after("config")
                .after("preferences"),
        )
        .unwrap();
    scheduler
}

#[tokio::test]
async fn dependents_start_only_after_dependencies_complete() {
    init_tracing();
    let probe = TaskProbe::new();
    let scheduler = chain(&probe);

    let report = with_timeout(scheduler.run_all()).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.run_id, 1);
    assert_eq!(
        report.completed,
        vec!["config".to_string(), "preferences".to_string(), "feature-flags".to_string()]
    );
    assert_eq!(probe.calls(), report.completed);

    let prefs = probe.observation("preferences").unwrap();
    assert!(matches!(prefs.state_of("config"), Some(TaskState::Completed(_))));
    assert_eq!(prefs.state_of("preferences"), Some(&TaskState::Running));
    assert_eq!(prefs.state_of("feature-flags"), Some(&TaskState::Pending));
    assert_eq!(*prefs.dependencies["config"], json!({"apiUrl": "x"}));

    let flags = probe.observation("feature-flags").unwrap();
    assert!(matches!(flags.state_of("config"), Some(TaskState::Completed(_))));
    assert!(matches!(flags.state_of("preferences"), Some(TaskState::Completed(_))));
    assert_eq!(flags.dependencies.len(), 2);

    assert!(scheduler.store().all_ready());
    for name in ["config", "preferences", "feature-flags"] {
        assert!(scheduler.is_ready(name));
    }
    assert_eq!(
        **scheduler.store().get("feature-flags").unwrap().output().unwrap(),
        json!({"beta": true})
    );
}

#[tokio::test]
async fn independent_roots_run_concurrently() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(probe.succeed_after("a", Duration::from_millis(60), json!(1)))
        .unwrap();
    scheduler
        .register(probe.succeed_after("b", Duration::from_millis(10), json!(2)))
        .unwrap();

    with_timeout(scheduler.run_all()).await.unwrap();

    // b starts while a is still in flight.
    let b = probe.observation("b").unwrap();
    assert!(matches!(
        b.state_of("a"),
        Some(TaskState::Running) | Some(TaskState::Pending)
    ));
}

#[tokio::test]
async fn failure_propagates_to_transitive_dependents_without_running_them() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(probe.fail("config", "endpoint down"))
        .unwrap();
    scheduler
        .register(probe.succeed("preferences", json!({})).after("config"))
        .unwrap();
    scheduler
        .register(probe.succeed("widgets", json!({})).after("preferences"))
        .unwrap();
    scheduler
        .register(probe.succeed("theme", json!({"dark": false})))
        .unwrap();

    let report = with_timeout(scheduler.run_all()).await.unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(report.completed, vec!["theme".to_string()]);
    assert_eq!(report.failed.len(), 3);

    assert_eq!(
        report.error_of("config"),
        Some(&TaskError::Execution {
            task: "config".into(),
            message: "endpoint down".into(),
        })
    );
    assert_eq!(
        report.error_of("preferences"),
        Some(&TaskError::DependencyFailed {
            task: "preferences".into(),
            dependency: "config".into(),
        })
    );
    assert_eq!(
        report.error_of("widgets"),
        Some(&TaskError::DependencyFailed {
            task: "widgets".into(),
            dependency: "preferences".into(),
        })
    );

    assert_eq!(probe.call_count("preferences"), 0);
    assert_eq!(probe.call_count("widgets"), 0);
    assert_eq!(probe.call_count("theme"), 1);

    assert!(matches!(
        scheduler.store().get("widgets"),
        Some(TaskState::Failed(TaskError::DependencyFailed { .. }))
    ));
    assert!(scheduler.is_ready("theme"));
    assert!(!scheduler.store().all_ready());
}

#[tokio::test]
async fn timeout_marks_task_failed() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(
            probe
                .succeed_after("slow", Duration::from_secs(2), json!({}))
                .timeout(Duration::from_millis(20)),
        )
        .unwrap();
    scheduler
        .register(probe.succeed("after-slow", json!({})).after("slow"))
        .unwrap();

    let report = with_timeout(scheduler.run_all()).await.unwrap();

    assert_eq!(
        report.error_of("slow"),
        Some(&TaskError::Timeout {
            task: "slow".into(),
            timeout: Duration::from_millis(20),
        })
    );
    assert!(matches!(
        report.error_of("after-slow"),
        Some(TaskError::DependencyFailed { .. })
    ));
    assert_eq!(probe.call_count("after-slow"), 0);
}

#[tokio::test]
async fn timed_out_action_keeps_running_but_its_result_is_discarded() {
    init_tracing();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let mut scheduler = InitScheduler::new();
    scheduler
        .register(
            InitTask::new("slow", move |_ctx: TaskContext| {
                let flag = Arc::clone(&flag);
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    flag.store(true, Ordering::SeqCst);
                    anyhow::Ok(json!({"late": true}))
                }
            })
            .timeout(Duration::from_millis(20)),
        )
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = scheduler
        .store()
        .subscribe("slow", move |state| sink.lock().unwrap().push(state.label()))
        .unwrap();

    let report = with_timeout(scheduler.run_all()).await.unwrap();
    assert!(matches!(report.error_of("slow"), Some(TaskError::Timeout { .. })));
    assert!(!finished.load(Ordering::SeqCst));

    // Give the detached action time to finish.
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(finished.load(Ordering::SeqCst), "timed-out action was cancelled");
    assert!(matches!(
        scheduler.store().get("slow"),
        Some(TaskState::Failed(TaskError::Timeout { .. }))
    ));
    assert_eq!(*seen.lock().unwrap(), vec!["pending", "running", "failed"]);
    assert!(!scheduler.is_ready("slow"));
}

#[tokio::test]
async fn panicking_action_is_recorded_as_execution_failure() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler.register(probe.panic("boom", "kaboom")).unwrap();

    let report = with_timeout(scheduler.run_all()).await.unwrap();

    match report.error_of("boom") {
        Some(TaskError::Execution { task, message }) => {
            assert_eq!(task, "boom");
            assert!(message.contains("kaboom"), "unexpected message: {message}");
        }
        other => panic!("expected Execution error, got {other:?}"),
    }
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn concurrent_awaiters_share_one_result() {
    init_tracing();
    let probe = TaskProbe::new();
    let scheduler = Arc::new(chain(&probe));

    let first = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.await_task("preferences").await })
    };
    let second = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.await_task("preferences").await })
    };

    // Waiting alone never starts anything.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(probe.calls().is_empty());

    let report = with_timeout(scheduler.run_all()).await.unwrap();
    assert!(report.all_succeeded());

    let first = with_timeout(first).await.unwrap().unwrap();
    let second = with_timeout(second).await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*first, json!({"theme": "dark"}));
    assert_eq!(probe.call_count("preferences"), 1);
}

#[tokio::test]
async fn await_task_reports_failure() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler.register(probe.fail("config", "no network")).unwrap();

    with_timeout(scheduler.run_all()).await.unwrap();
    let err = with_timeout(scheduler.await_task("config")).await.unwrap_err();

    assert!(matches!(
        err,
        InitError::TaskFailed(TaskError::Execution { ref message, .. }) if message == "no network"
    ));
}

#[tokio::test]
async fn await_task_on_unknown_task_is_an_error() {
    init_tracing();
    let scheduler = InitScheduler::new();

    let err = scheduler.await_task("nope").await.unwrap_err();

    assert!(matches!(err, InitError::TaskNotFound(ref name) if name == "nope"));
    assert!(!scheduler.is_ready("nope"));
}

#[tokio::test]
async fn is_ready_tracks_progress() {
    init_tracing();
    let probe = TaskProbe::new();
    let scheduler = Arc::new(chain(&probe));

    assert!(!scheduler.is_ready("config"));

    let run = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_all().await })
    };

    with_timeout(scheduler.await_task("config")).await.unwrap();
    assert!(scheduler.is_ready("config"));

    with_timeout(run).await.unwrap().unwrap();
    assert!(scheduler.is_ready("feature-flags"));
}

#[tokio::test]
async fn second_run_while_in_flight_is_rejected() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(probe.succeed_after("slow", Duration::from_millis(100), json!({})))
        .unwrap();
    let scheduler = Arc::new(scheduler);

    let mut slow = scheduler.store().watch("slow").unwrap();
    let run = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_all().await })
    };
    with_timeout(slow.wait_for(|state| *state == TaskState::Running))
        .await
        .unwrap();

    assert!(scheduler.is_running());
    let err = scheduler.run_all().await.unwrap_err();
    assert!(matches!(err, InitError::RunInProgress));

    with_timeout(run).await.unwrap().unwrap();
    assert!(!scheduler.is_running());
    assert_eq!(probe.call_count("slow"), 1);
}

#[tokio::test]
async fn refresh_reruns_every_task_in_order() {
    init_tracing();
    let probe = TaskProbe::new();
    let scheduler = chain(&probe);

    let first = with_timeout(scheduler.run_all()).await.unwrap();
    let second = with_timeout(scheduler.refresh()).await.unwrap();

    assert_eq!(first.run_id, 1);
    assert_eq!(second.run_id, 2);
    assert!(second.all_succeeded());

    for name in ["config", "preferences", "feature-flags"] {
        assert_eq!(probe.call_count(name), 2, "{name} should run once per run");
    }

    // On the second run preferences again waited for a fresh config.
    let prefs = probe.observations_of("preferences");
    assert_eq!(prefs[1].run_id, 2);
    assert!(matches!(prefs[1].state_of("config"), Some(TaskState::Completed(_))));
    assert_eq!(prefs[1].state_of("feature-flags"), Some(&TaskState::Pending));
    assert!(scheduler.store().all_ready());
}

#[tokio::test]
async fn missing_edge_lets_dependent_observe_pending_dependency() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();
    scheduler
        .register(probe.succeed_after("config", Duration::from_millis(50), json!({})))
        .unwrap();
    // No `.after("config")`: nothing orders the two.
    scheduler
        .register(probe.succeed("preferences", json!({})))
        .unwrap();

    with_timeout(scheduler.run_all()).await.unwrap();

    let prefs = probe.observation("preferences").unwrap();
    assert!(!matches!(prefs.state_of("config"), Some(TaskState::Completed(_))));
    assert!(prefs.dependencies.is_empty());
}

#[tokio::test]
async fn empty_scheduler_runs_to_completion() {
    init_tracing();
    let scheduler = InitScheduler::new();

    let report = with_timeout(scheduler.run_all()).await.unwrap();

    assert!(report.all_succeeded());
    assert!(report.completed.is_empty());
    assert!(scheduler.store().all_ready());
}
