// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::task::TaskDefinition;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies, as declared (may name unknown tasks).
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one as a dependency.
    dependents: Vec<TaskName>,
}

/// In-memory dependency graph keyed by task id, remembering input order.
///
/// Nothing here rejects cycles or unknown dependencies; those are reported
/// by [`DagGraph::diagnostics`] and otherwise simply never become ready.
#[derive(Debug, Clone)]
pub struct DagGraph {
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build the graph from definitions whose ids are already known to be
    /// unique.
    pub fn from_definitions(defs: &[TaskDefinition]) -> Self {
        let mut order = Vec::with_capacity(defs.len());
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::with_capacity(defs.len());

        for def in defs {
            order.push(def.id.clone());
            nodes.insert(
                def.id.clone(),
                DagNode {
                    deps: def.dependencies.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        for def in defs {
            for dep in &def.dependencies {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(def.id.clone());
                }
            }
        }

        Self { order, nodes }
    }

    /// Task ids in input order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immediate dependencies of a task, as declared.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Find the structural problems that leave tasks `Pending` forever.
    pub fn diagnostics(&self) -> GraphDiagnostics {
        let position: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }

        let mut dangling = Vec::new();
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                if self.contains(dep) {
                    graph.add_edge(dep.as_str(), name.as_str(), ());
                } else {
                    dangling.push((name.clone(), dep.clone()));
                }
            }
        }

        let mut cycles: Vec<Vec<TaskName>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort_by_key(|name| position.get(name).copied().unwrap_or(usize::MAX));
                scc.into_iter().map(str::to_string).collect()
            })
            .collect();
        cycles.sort_by_key(|cycle: &Vec<TaskName>| {
            cycle
                .first()
                .and_then(|name| position.get(name.as_str()).copied())
                .unwrap_or(usize::MAX)
        });

        let unreachable = self.downstream_of(
            cycles
                .iter()
                .flatten()
                .chain(dangling.iter().map(|(task, _)| task)),
        );

        GraphDiagnostics {
            dangling,
            cycles,
            unreachable,
        }
    }

    /// The given seeds plus everything that transitively depends on them,
    /// in input order.
    fn downstream_of<'a>(&self, seeds: impl Iterator<Item = &'a TaskName>) -> Vec<TaskName> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = seeds.map(|s| s.as_str()).collect();

        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            stack.extend(self.dependents_of(name).iter().map(|s| s.as_str()));
        }

        self.order
            .iter()
            .filter(|name| seen.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Structural problems found in a task graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDiagnostics {
    /// `(task, missing dependency)` pairs.
    pub dangling: Vec<(TaskName, TaskName)>,
    /// Dependency cycles, each listed in input order.
    pub cycles: Vec<Vec<TaskName>>,
    /// Every task that can never become ready, in input order.
    pub unreachable: Vec<TaskName>,
}

impl GraphDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.cycles.is_empty()
    }

    /// One-line human readable summary.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (task, dep) in &self.dangling {
            parts.push(format!("task '{task}' depends on unknown task '{dep}'"));
        }
        for cycle in &self.cycles {
            parts.push(format!("dependency cycle [{}]", cycle.join(", ")));
        }
        if !self.unreachable.is_empty() {
            parts.push(format!("unreachable: [{}]", self.unreachable.join(", ")));
        }
        parts.join("; ")
    }
}
