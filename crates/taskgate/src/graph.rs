//! Dependency graph snapshot and cycle detection.
//!
//! The graph uses a **dependent -> dependency** edge direction:
//!
//! - **Edge source**: the task that has the dependency
//! - **Edge target**: the task being depended upon
//!
//! So for "A depends on B" the edge is `A -> B`, and following outgoing
//! edges from a node walks everything it (transitively) waits on.
//!
//! Nodes are task identifiers, not tasks. A node whose task has been deleted
//! stays in the graph for as long as some edge still points at it.

use crate::domain::TaskId;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Adjacency structure over task identifiers.
///
/// Built fresh from the store for every check; nothing holds on to one
/// across transactions.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes contain `TaskId` values; edges carry no weight.
    graph: DiGraph<TaskId, ()>,

    /// Mapping from `TaskId` to graph `NodeIndex`.
    node_map: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(task, depends_on)` pairs.
    pub fn from_edges(edges: impl IntoIterator<Item = (TaskId, TaskId)>) -> Self {
        let mut graph = Self::new();
        for (task, depends_on) in edges {
            graph.add_edge(task, depends_on);
        }
        graph
    }

    fn node(&mut self, id: TaskId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(&id) {
            return node;
        }
        let node = self.graph.add_node(id);
        self.node_map.insert(id, node);
        node
    }

    /// Record that `task` depends on `depends_on`.
    ///
    /// Returns `false` if the edge was already present, in which case the
    /// graph is unchanged.
    pub fn add_edge(&mut self, task: TaskId, depends_on: TaskId) -> bool {
        let from = self.node(task);
        let to = self.node(depends_on);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Returns `true` if `task` directly depends on `depends_on`.
    #[must_use]
    pub fn contains_edge(&self, task: TaskId, depends_on: TaskId) -> bool {
        match (self.node_map.get(&task), self.node_map.get(&depends_on)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    /// Direct dependencies of `task`, ascending.
    #[must_use]
    pub fn dependencies_of(&self, task: TaskId) -> BTreeSet<TaskId> {
        self.neighbors(task, Direction::Outgoing)
    }

    /// Tasks that directly depend on `task`, ascending.
    #[must_use]
    pub fn dependents_of(&self, task: TaskId) -> BTreeSet<TaskId> {
        self.neighbors(task, Direction::Incoming)
    }

    fn neighbors(&self, task: TaskId, direction: Direction) -> BTreeSet<TaskId> {
        self.node_map
            .get(&task)
            .map(|&node| {
                self.graph
                    .neighbors_directed(node, direction)
                    .map(|n| self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every edge going out of `task`.
    ///
    /// Incoming edges are left alone; they become dangling once the task
    /// itself is gone.
    pub fn remove_outgoing(&mut self, task: TaskId) {
        let Some(&node) = self.node_map.get(&task) else {
            return;
        };
        let mut edges: Vec<_> = self.graph.edges(node).map(|edge| edge.id()).collect();
        // remove_edge moves the last edge into the freed slot, so go from the top.
        edges.sort_unstable_by(|a, b| b.cmp(a));
        for edge in edges {
            self.graph.remove_edge(edge);
        }
    }

    /// Every edge as a `(task, depends_on)` pair, ascending.
    #[must_use]
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|edge| (self.graph[edge.source()], self.graph[edge.target()]))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if the relation contains no cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        algo::toposort(&self.graph, None).is_ok()
    }
}

/// Decide whether adding `task -> dependency` would close a cycle.
///
/// A task depending on itself is a one-node cycle. Otherwise the edge closes
/// a cycle exactly when `dependency` already reaches `task`, so the search
/// walks outward from `dependency` along existing edges looking for `task`.
///
/// The walk is an explicit stack with a visited set local to this call. A
/// visited node is never expanded twice, which bounds the cost at O(V + E)
/// and guarantees termination even if the stored relation is already cyclic.
#[must_use]
pub fn would_create_cycle(graph: &DependencyGraph, task: TaskId, dependency: TaskId) -> bool {
    if task == dependency {
        return true;
    }

    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut stack = vec![dependency];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        for next in graph.dependencies_of(current) {
            if next == task {
                return true;
            }
            if !visited.contains(&next) {
                stack.push(next);
            }
        }
    }

    false
}
