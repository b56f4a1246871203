use initdag::{InitError, InitScheduler, TaskState};
use initdag_test_utils::init_tracing;
use initdag_test_utils::probe::TaskProbe;
use serde_json::json;

#[test]
fn duplicate_registration_is_rejected() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler.register(probe.succeed("config", json!({}))).unwrap();
    let err = scheduler
        .register(probe.succeed("config", json!({"second": true})))
        .unwrap_err();

    assert!(matches!(err, InitError::DuplicateTask(ref name) if name == "config"));
    assert_eq!(scheduler.task_names(), vec!["config".to_string()]);
}

#[test]
fn registration_adds_pending_entry() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    assert!(scheduler.store().get("config").is_none());
    scheduler.register(probe.succeed("config", json!({}))).unwrap();

    assert_eq!(scheduler.store().get("config"), Some(TaskState::Pending));
    assert!(!scheduler.is_ready("config"));
    assert!(!scheduler.store().all_ready());
}

#[test]
fn forward_reference_is_accepted_until_validation() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler
        .register(probe.succeed("preferences", json!({})).after("config"))
        .unwrap();

    let err = scheduler.validate().unwrap_err();
    match err {
        InitError::UnknownDependency { task, dependency } => {
            assert_eq!(task, "preferences");
            assert_eq!(dependency, "config");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }

    scheduler.register(probe.succeed("config", json!({}))).unwrap();
    scheduler.validate().unwrap();
    assert_eq!(
        scheduler.execution_order().unwrap(),
        vec!["config".to_string(), "preferences".to_string()]
    );
}

#[tokio::test]
async fn unknown_dependency_fails_run_before_anything_runs() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler.register(probe.succeed("config", json!({}))).unwrap();
    scheduler
        .register(probe.succeed("preferences", json!({})).after("missing"))
        .unwrap();

    let err = scheduler.run_all().await.unwrap_err();

    assert!(matches!(err, InitError::UnknownDependency { .. }));
    assert!(probe.calls().is_empty());
    for (_, state) in scheduler.store().snapshot() {
        assert_eq!(state, TaskState::Pending);
    }
    assert!(!scheduler.is_running());
}

#[test]
fn two_task_cycle_is_rejected_at_registration() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler
        .register(probe.succeed("a", json!({})).after("b"))
        .unwrap();
    let err = scheduler
        .register(probe.succeed("b", json!({})).after("a"))
        .unwrap_err();

    assert!(matches!(err, InitError::CyclicDependency(_)));
    // The rejected task leaves no trace.
    assert_eq!(scheduler.task_names(), vec!["a".to_string()]);
    assert!(scheduler.store().get("b").is_none());
}

#[test]
fn longer_cycle_is_rejected_at_registration() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler.register(probe.succeed("a", json!({})).after("c")).unwrap();
    scheduler.register(probe.succeed("b", json!({})).after("a")).unwrap();
    let err = scheduler
        .register(probe.succeed("c", json!({})).after("b"))
        .unwrap_err();

    assert!(matches!(err, InitError::CyclicDependency(_)));
}

#[test]
fn self_dependency_is_a_cycle() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    let err = scheduler
        .register(probe.succeed("config", json!({})).after("config"))
        .unwrap_err();

    assert!(matches!(err, InitError::CyclicDependency(ref msg) if msg.contains("config")));
    assert!(scheduler.task_names().is_empty());
}

#[test]
fn execution_order_puts_dependencies_first() {
    init_tracing();
    let probe = TaskProbe::new();
    let mut scheduler = InitScheduler::new();

    scheduler
        .register(
            probe
                .succeed("feature-flags", json!({}))
                .after("config")
                .after("preferences"),
        )
        .unwrap();
    scheduler
        .register(probe.succeed("preferences", json!({})).after("config"))
        .unwrap();
    scheduler.register(probe.succeed("config", json!({}))).unwrap();

    let order = scheduler.execution_order().unwrap();
    let pos = |name: &str| order.iter().position(|t| t == name).unwrap();

    assert_eq!(order.len(), 3);
    assert!(pos("config") < pos("preferences"));
    assert!(pos("preferences") < pos("feature-flags"));
}
