use std::collections::{HashMap, HashSet};

use initdag::dag::{DagGraph, Scheduler, TaskRunState};
use initdag::engine::TaskOutcome;
use proptest::prelude::*;

// Strategy to generate an acyclic graph.
// Acyclicity is guaranteed by only letting task N depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential_deps)| {
                    let mut deps: Vec<String> = potential_deps
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|idx| format!("task_{}", idx % i))
                        .collect();
                    deps.sort();
                    deps.dedup();
                    (format!("task_{}", i), deps)
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn every_task_settles_exactly_once_and_after_its_deps(
        edges in dag_strategy(10),
        failing_indices in proptest::collection::vec(0..10usize, 0..4),
        pick in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let deps_of: HashMap<String, Vec<String>> = edges.iter().cloned().collect();
        let failing: HashSet<String> = failing_indices
            .iter()
            .map(|i| format!("task_{}", i))
            .collect();

        let mut scheduler = Scheduler::new(DagGraph::from_edges(edges.clone()));
        let mut succeeded: HashSet<String> = HashSet::new();
        let mut settled: HashMap<String, usize> = HashMap::new();
        let mut blocked: HashSet<String> = HashSet::new();

        // Tasks currently "executing".
        let mut executing: Vec<String> = Vec::new();

        let step = scheduler.start_run(1);
        prop_assert!(step.newly_blocked.is_empty());
        for st in step.newly_scheduled {
            prop_assert_eq!(scheduler.deps_satisfied(&st.name), Some(true));
            for dep in &deps_of[&st.name] {
                prop_assert!(succeeded.contains(dep));
            }
            executing.push(st.name);
        }

        let mut picks = pick.into_iter();
        let mut steps = 0;
        let max_steps = 1000;

        while !scheduler.is_idle() && steps < max_steps {
            steps += 1;

            // A live run with nothing executing means a task was never
            // scheduled even though its deps are done.
            prop_assert!(!executing.is_empty(), "run stalled with nothing executing");

            // Complete tasks in an arbitrary order.
            let idx = picks.next().unwrap_or(0) % executing.len();
            let task = executing.remove(idx);

            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed
            } else {
                TaskOutcome::Success
            };
            if outcome == TaskOutcome::Success {
                succeeded.insert(task.clone());
            }
            *settled.entry(task.clone()).or_default() += 1;

            let step = scheduler.handle_completion(&task, outcome);

            for b in step.newly_blocked {
                prop_assert!(!blocked.contains(&b.task), "{} blocked twice", b.task);
                prop_assert!(!succeeded.contains(&b.task));
                *settled.entry(b.task.clone()).or_default() += 1;
                blocked.insert(b.task);
            }

            for st in step.newly_scheduled {
                prop_assert!(!blocked.contains(&st.name), "{} scheduled after being blocked", st.name);
                prop_assert_eq!(scheduler.deps_satisfied(&st.name), Some(true));
                for dep in &deps_of[&st.name] {
                    prop_assert!(
                        succeeded.contains(dep),
                        "{} scheduled before dependency {} succeeded",
                        st.name,
                        dep
                    );
                }
                executing.push(st.name);
            }
        }

        prop_assert!(steps < max_steps, "simulation did not terminate");
        prop_assert!(scheduler.is_idle());
        prop_assert!(executing.is_empty());

        for (name, _) in &edges {
            prop_assert_eq!(settled.get(name).copied(), Some(1), "{} settled {:?} times", name, settled.get(name));

            let state = scheduler.run_state_of(name);
            if succeeded.contains(name) {
                prop_assert_eq!(state, Some(TaskRunState::DoneSuccess));
            } else {
                prop_assert_eq!(state, Some(TaskRunState::DoneFailed));
            }
        }
    }

    #[test]
    fn duplicate_completions_are_ignored(edges in dag_strategy(6)) {
        let mut scheduler = Scheduler::new(DagGraph::from_edges(edges.clone()));
        let step = scheduler.start_run(7);
        let first = step.newly_scheduled[0].name.clone();

        let _ = scheduler.handle_completion(&first, TaskOutcome::Success);
        let again = scheduler.handle_completion(&first, TaskOutcome::Failed);

        prop_assert!(again.newly_scheduled.is_empty());
        prop_assert!(again.newly_blocked.is_empty());
        if !scheduler.is_idle() {
            prop_assert_eq!(scheduler.run_state_of(&first), Some(TaskRunState::DoneSuccess));
        }
    }
}
