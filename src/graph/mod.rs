pub mod edge;
pub mod node;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use petgraph::Directed;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use regex::Regex;
use serde::Serialize;

use crate::query::stats::{GraphStats, compute_stats};
use edge::CallEdge;
use node::Node;

/// Two declarations claiming the same node name. The first one seen is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub name: String,
    pub kept_path: PathBuf,
    pub kept_line: usize,
    pub dropped_path: PathBuf,
    pub dropped_line: usize,
}

/// Package and function-name filters applied before nodes enter a graph.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub name: Option<Regex>,
    pub package: Option<Regex>,
}

impl NodeFilter {
    /// Compile optional patterns. Empty strings mean "no filter".
    pub fn new(name: Option<&str>, package: Option<&str>) -> anyhow::Result<Self> {
        let compile = |pattern: Option<&str>, what: &str| -> anyhow::Result<Option<Regex>> {
            match pattern.map(str::trim) {
                None | Some("") => Ok(None),
                Some(p) => Regex::new(p)
                    .map(Some)
                    .map_err(|e| anyhow::anyhow!("invalid {} filter '{}': {}", what, p, e)),
            }
        };
        Ok(Self {
            name: compile(name, "name")?,
            package: compile(package, "package")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.package.is_none()
    }

    pub fn matches(&self, node: &Node) -> bool {
        if let Some(re) = &self.name
            && !re.is_match(&node.name)
        {
            return false;
        }
        if let Some(re) = &self.package
            && !re.is_match(&node.package)
        {
            return false;
        }
        true
    }

    /// Drop non-matching nodes and prune call sites that pointed at them.
    pub fn apply(&self, nodes: Vec<Node>) -> Vec<Node> {
        if self.is_empty() {
            return nodes;
        }
        let (mut kept, excluded): (Vec<Node>, Vec<Node>) =
            nodes.into_iter().partition(|n| self.matches(n));
        let excluded: HashSet<String> = excluded.into_iter().map(|n| n.name).collect();
        for node in &mut kept {
            node.call_sites.retain(|cs| !excluded.contains(&cs.target));
        }
        kept
    }
}

/// The analyzed workflow call graph: nodes keyed by name plus a petgraph index
/// of call-site edges from which every node's `parents` list is derived.
pub struct WorkflowGraph {
    nodes: BTreeMap<String, Node>,
    index: StableGraph<String, CallEdge, Directed>,
    node_index: HashMap<String, NodeIndex>,
    /// Parents attached by the runtime resolver, with no matching call site.
    synthetic_parents: HashMap<String, Vec<String>>,
    collisions: Vec<NameCollision>,
    stats: GraphStats,
}

impl WorkflowGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            index: StableGraph::new(),
            node_index: HashMap::new(),
            synthetic_parents: HashMap::new(),
            collisions: Vec::new(),
            stats: GraphStats::default(),
        }
    }

    /// Build a graph from discovered nodes.
    ///
    /// Nodes are inserted in iteration order (first-seen wins on a name
    /// collision), then parents are wired in a second pass so the result does
    /// not depend on the order the nodes were discovered in.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            if let Err(collision) = graph.insert_node(node) {
                graph.collisions.push(collision);
            }
        }
        graph.rebuild_index();
        graph
    }

    fn insert_node(&mut self, mut node: Node) -> Result<(), NameCollision> {
        if let Some(existing) = self.nodes.get(&node.name) {
            return Err(NameCollision {
                name: node.name.clone(),
                kept_path: existing.file_path.clone(),
                kept_line: existing.line,
                dropped_path: node.file_path,
                dropped_line: node.line,
            });
        }
        node.parents.clear();
        let idx = self.index.add_node(node.name.clone());
        self.node_index.insert(node.name.clone(), idx);
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Recompute call-site edges, every node's parents, and the stats snapshot.
    fn rebuild_index(&mut self) {
        self.index.clear_edges();

        for node in self.nodes.values() {
            let from = self.node_index[&node.name];
            for cs in &node.call_sites {
                if let Some(&to) = self.node_index.get(&cs.target) {
                    self.index.add_edge(
                        from,
                        to,
                        CallEdge {
                            kind: cs.kind,
                            line: cs.line,
                        },
                    );
                }
            }
        }

        let mut parents_by_name: HashMap<String, Vec<String>> = HashMap::new();
        for (name, &idx) in &self.node_index {
            let mut parents: Vec<String> = self
                .index
                .neighbors_directed(idx, Direction::Incoming)
                .map(|p| self.index[p].clone())
                .collect();
            parents.sort();
            parents.dedup();
            if let Some(synthetic) = self.synthetic_parents.get(name) {
                for p in synthetic {
                    if !parents.contains(p) {
                        parents.push(p.clone());
                    }
                }
            }
            parents_by_name.insert(name.clone(), parents);
        }
        for (name, parents) in parents_by_name {
            if let Some(node) = self.nodes.get_mut(&name) {
                node.parents = parents;
            }
        }

        self.stats = compute_stats(self);
    }

    /// Merge a node produced by the runtime resolver. Append-only: returns
    /// `false` and leaves the graph untouched when the name already exists.
    ///
    /// The node's own call sites join the edge index. Its pre-filled parents
    /// (the caller that drilled into it) are kept as synthetic parents and never
    /// become call-site edges.
    pub fn merge_resolved(&mut self, mut node: Node) -> bool {
        if self.nodes.contains_key(&node.name) {
            return false;
        }
        let synthetic = std::mem::take(&mut node.parents);
        let name = node.name.clone();
        if self.insert_node(node).is_err() {
            return false;
        }
        if !synthetic.is_empty() {
            self.synthetic_parents.insert(name, synthetic);
        }
        self.rebuild_index();
        true
    }

    /// Copy of this graph restricted to nodes matching `filter`.
    pub fn filtered(&self, filter: &NodeFilter) -> WorkflowGraph {
        let nodes = filter.apply(self.nodes.values().cloned().collect());
        let mut graph = Self::new();
        for node in nodes {
            let _ = graph.insert_node(node);
        }
        graph.synthetic_parents = self
            .synthetic_parents
            .iter()
            .filter(|(name, _)| graph.nodes.contains_key(*name))
            .map(|(name, parents)| {
                let kept: Vec<String> = parents
                    .iter()
                    .filter(|p| graph.nodes.contains_key(*p))
                    .cloned()
                    .collect();
                (name.clone(), kept)
            })
            .collect();
        graph.collisions = self.collisions.clone();
        graph.rebuild_index();
        graph
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes, sorted by name.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes with no parents, sorted by name.
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.parents.is_empty()).collect()
    }

    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }

    /// The call-site edge index (caller -> callee), for graph algorithms.
    pub fn call_index(&self) -> &StableGraph<String, CallEdge, Directed> {
        &self.index
    }

    /// Whether `parent` is recorded on `name` only as a resolver-attached synthetic parent.
    pub fn is_synthetic_parent(&self, name: &str, parent: &str) -> bool {
        self.synthetic_parents
            .get(name)
            .is_some_and(|ps| ps.iter().any(|p| p == parent))
            && !self.has_call_edge(parent, name)
    }

    fn has_call_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_index.get(from), self.node_index.get(to)) {
            (Some(&a), Some(&b)) => self.index.contains_edge(a, b),
            _ => false,
        }
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}
