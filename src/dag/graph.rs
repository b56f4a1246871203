// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{InitError, Result};
use crate::task::InitTask;
use crate::types::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory dependency graph keyed by task name.
///
/// Derived from the registered tasks each time it is needed; never stored
/// across registrations. Dependencies naming unregistered tasks are kept in
/// `deps` (so [`validate_dependencies`](Self::validate_dependencies) can
/// report them) but produce no edge.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build a graph from registered task definitions.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a InitTask>) -> Self {
        Self::from_edges(
            tasks
                .into_iter()
                .map(|task| (task.name().to_string(), task.deps().to_vec())),
        )
    }

    /// Build a graph from `(task, dependencies)` pairs.
    pub fn from_edges(edges: impl IntoIterator<Item = (TaskName, Vec<TaskName>)>) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        // First pass: create nodes with their dependency lists.
        for (name, deps) in edges {
            let mut unique: Vec<TaskName> = Vec::with_capacity(deps.len());
            for dep in deps {
                if !unique.contains(&dep) {
                    unique.push(dep);
                }
            }
            nodes.insert(
                name,
                DagNode {
                    deps: unique,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        let task_names: Vec<TaskName> = nodes.keys().cloned().collect();
        for task_name in task_names {
            let deps = nodes
                .get(&task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one as a dependency).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Every dependency must name a task in the graph.
    pub fn validate_dependencies(&self) -> Result<()> {
        let mut names: Vec<&TaskName> = self.nodes.keys().collect();
        names.sort();

        for name in names {
            for dep in self.dependencies_of(name) {
                if !self.nodes.contains_key(dep) {
                    return Err(InitError::UnknownDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reject self-dependencies and cycles among known tasks.
    pub fn check_acyclic(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// One valid execution order (dependencies first).
    ///
    /// Edges to unknown tasks are ignored; call
    /// [`validate_dependencies`](Self::validate_dependencies) first when
    /// those matter.
    pub fn topological_order(&self) -> Result<Vec<TaskName>> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        let mut names: Vec<&str> = self.tasks().collect();
        names.sort();
        for &name in &names {
            graph.add_node(name);
        }

        for &name in &names {
            for dep in self.dependencies_of(name) {
                if dep.as_str() == name {
                    return Err(InitError::CyclicDependency(format!(
                        "task '{}' depends on itself",
                        name
                    )));
                }
                if self.nodes.contains_key(dep) {
                    graph.add_edge(dep.as_str(), name, ());
                }
            }
        }

        // A topological sort will fail if there is a cycle.
        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(InitError::CyclicDependency(format!(
                "cycle detected in init graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
