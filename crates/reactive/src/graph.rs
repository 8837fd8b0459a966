//! Dependency graph management.
//!
//! The vertex set is fixed when the store is built: one node per declared
//! data property, filter and group. Edges are discovered at runtime while
//! filters execute. By default edges are only ever added; a filter that stops
//! reading a property keeps the stale edge.

use hashbrown::HashMap;
use indexmap::IndexSet;
use pulse_core::NodeKey;
use serde::{Deserialize, Serialize};

/// What a graph node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A mutable data property.
    Data,
    /// A derived filter.
    Filter,
    /// A materialized group.
    Group,
}

/// How a filter's edges are updated after a successful regeneration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Union the newly discovered reads into the existing edges.
    #[default]
    Accumulate,
    /// Replace the filter's edges with exactly the reads of the latest run.
    Recompute,
}

/// A vertex of the dependency graph.
#[derive(Clone, Debug)]
pub struct GraphNode {
    kind: NodeKind,
    /// Nodes this node's value was computed from
    dependencies: IndexSet<NodeKey>,
    /// Nodes that read this node while being computed
    dependents: IndexSet<NodeKey>,
    /// Whether a filter has completed its first generation
    generated: bool,
}

impl GraphNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            generated: false,
        }
    }

    /// Returns what this node stands for.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the nodes this node was computed from.
    #[inline]
    pub fn dependencies(&self) -> &IndexSet<NodeKey> {
        &self.dependencies
    }

    /// Returns the nodes computed from this node.
    #[inline]
    pub fn dependents(&self) -> &IndexSet<NodeKey> {
        &self.dependents
    }

    /// Returns whether this filter has been generated at least once.
    #[inline]
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

/// Result of a transitive dependent search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependentSearch {
    /// Reachable dependents, each placed at the deepest round it was reached.
    pub nodes: Vec<NodeKey>,
    /// Expansion rounds performed.
    pub rounds: usize,
    /// True if the round bound was hit and the search was truncated.
    pub overflowed: bool,
}

/// Directed graph of `collection/property` nodes.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<NodeKey, GraphNode>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex. Returns false if it already exists.
    pub fn add_node(&mut self, key: NodeKey, kind: NodeKind) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(key, GraphNode::new(kind));
        true
    }

    /// Returns true if `key` is a vertex.
    #[inline]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Gets a vertex.
    #[inline]
    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    /// Returns true if `key` is a declared filter.
    pub fn is_filter(&self, key: &NodeKey) -> bool {
        self.kind(key) == Some(NodeKind::Filter)
    }

    /// Returns the kind of a vertex.
    pub fn kind(&self, key: &NodeKey) -> Option<NodeKind> {
        self.nodes.get(key).map(GraphNode::kind)
    }

    /// Returns whether a filter has completed its first generation.
    pub fn is_generated(&self, key: &NodeKey) -> bool {
        self.nodes.get(key).map(GraphNode::is_generated).unwrap_or(false)
    }

    /// Marks a filter as generated.
    pub fn mark_generated(&mut self, key: &NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.generated = true;
        }
    }

    /// Returns the first filter in `found` that has not been generated yet.
    ///
    /// `filter` itself is ignored: a filter may read its own previous output.
    pub fn first_unresolved<'a>(&self, filter: &NodeKey, found: &'a [NodeKey]) -> Option<&'a NodeKey> {
        found
            .iter()
            .find(|dep| *dep != filter && self.is_filter(dep) && !self.is_generated(dep))
    }

    /// Registers the reads discovered while `filter` executed.
    ///
    /// Each read becomes a dependency of `filter`; `filter` becomes a dependent
    /// of each read that is itself a vertex.
    pub fn populate(&mut self, filter: &NodeKey, found: &[NodeKey], policy: EdgePolicy) {
        if policy == EdgePolicy::Recompute {
            let stale: Vec<NodeKey> = self
                .nodes
                .get(filter)
                .map(|node| {
                    node.dependencies
                        .iter()
                        .filter(|dep| !found.contains(dep))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for dep in &stale {
                if let Some(node) = self.nodes.get_mut(dep) {
                    node.dependents.shift_remove(filter);
                }
            }
            if let Some(node) = self.nodes.get_mut(filter) {
                node.dependencies.retain(|dep| found.contains(dep));
            }
        }

        for dep in found {
            if let Some(node) = self.nodes.get_mut(filter) {
                node.dependencies.insert(dep.clone());
            }
            if let Some(node) = self.nodes.get_mut(dep) {
                node.dependents.insert(filter.clone());
            }
        }
    }

    /// Collects every node transitively reachable over dependent edges.
    ///
    /// Nodes are ordered by the deepest round in which they were reached, so
    /// on an acyclic graph every node comes after all nodes it reads. After
    /// `max_rounds` expansion rounds the search stops and is marked overflowed.
    pub fn find_all_dependents(&self, start: &NodeKey, max_rounds: usize) -> DependentSearch {
        self.find_all_dependents_of(core::slice::from_ref(start), max_rounds)
    }

    /// Same as [`DependencyGraph::find_all_dependents`] for several changed
    /// nodes at once, with a single ordering across all of them.
    pub fn find_all_dependents_of(&self, starts: &[NodeKey], max_rounds: usize) -> DependentSearch {
        let mut found: IndexSet<NodeKey> = IndexSet::new();
        let mut frontier: IndexSet<NodeKey> = IndexSet::new();
        for start in starts {
            if let Some(node) = self.nodes.get(start) {
                frontier.extend(node.dependents.iter().cloned());
            }
        }
        found.extend(frontier.iter().cloned());

        let mut rounds = 0;
        let mut overflowed = false;
        while !frontier.is_empty() {
            if rounds == max_rounds {
                overflowed = true;
                break;
            }
            rounds += 1;

            let mut next: IndexSet<NodeKey> = IndexSet::new();
            for key in &frontier {
                if let Some(node) = self.nodes.get(key) {
                    // Self-reads are not followed
                    next.extend(node.dependents.iter().filter(|dep| *dep != key).cloned());
                }
            }
            for key in &next {
                // Move to the back: reached again at a deeper round
                found.shift_remove(key);
                found.insert(key.clone());
            }
            frontier = next;
        }

        DependentSearch {
            nodes: found.into_iter().collect(),
            rounds,
            overflowed,
        }
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
