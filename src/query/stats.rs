use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::WorkflowGraph;
use crate::graph::node::Classification;
use crate::query::call_tree::MAX_TREE_DEPTH;

/// Aggregated statistics derived from a [`WorkflowGraph`]. Never edited by hand;
/// the graph recomputes its snapshot whenever it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub workflows: usize,
    pub activities: usize,
    pub signals: usize,
    pub signal_handlers: usize,
    pub queries: usize,
    pub query_handlers: usize,
    pub updates: usize,
    pub update_handlers: usize,
    pub timers: usize,
    pub functions: usize,
    /// Stub nodes for framework targets declared outside the analyzed tree.
    pub external_nodes: usize,
    /// Total number of call sites across all nodes.
    pub total_connections: usize,
    /// Longest chain of nodes reachable from a parentless node, capped at [`MAX_TREE_DEPTH`].
    pub max_depth: usize,
    pub avg_fan_out: f64,
    pub max_fan_out: usize,
    pub orphan_nodes: usize,
}

impl GraphStats {
    /// Count for one classification.
    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::Workflow => self.workflows,
            Classification::Activity => self.activities,
            Classification::Signal => self.signals,
            Classification::SignalHandler => self.signal_handlers,
            Classification::Query => self.queries,
            Classification::QueryHandler => self.query_handlers,
            Classification::Update => self.updates,
            Classification::UpdateHandler => self.update_handlers,
            Classification::Timer => self.timers,
            Classification::Function => self.functions,
        }
    }
}

/// Compute statistics over a built graph.
pub fn compute_stats(graph: &WorkflowGraph) -> GraphStats {
    let mut stats = GraphStats {
        total_nodes: graph.len(),
        ..GraphStats::default()
    };

    for node in graph.nodes() {
        match node.classification {
            Classification::Workflow => stats.workflows += 1,
            Classification::Activity => stats.activities += 1,
            Classification::Signal => stats.signals += 1,
            Classification::SignalHandler => stats.signal_handlers += 1,
            Classification::Query => stats.queries += 1,
            Classification::QueryHandler => stats.query_handlers += 1,
            Classification::Update => stats.updates += 1,
            Classification::UpdateHandler => stats.update_handlers += 1,
            Classification::Timer => stats.timers += 1,
            Classification::Function => stats.functions += 1,
        }
        if node.external {
            stats.external_nodes += 1;
        }
        if node.is_orphan() {
            stats.orphan_nodes += 1;
        }
        stats.total_connections += node.fan_out();
        stats.max_fan_out = stats.max_fan_out.max(node.fan_out());
    }

    if stats.total_nodes > 0 {
        stats.avg_fan_out = stats.total_connections as f64 / stats.total_nodes as f64;
    }
    stats.max_depth = max_depth(graph);
    stats
}

/// Longest walk (in nodes) from any parentless node along in-graph call sites.
fn max_depth(graph: &WorkflowGraph) -> usize {
    let mut on_path: HashSet<&str> = HashSet::new();
    let mut memo: HashMap<&str, usize> = HashMap::new();

    graph
        .roots()
        .into_iter()
        .map(|root| height(graph, &root.name, 1, &mut on_path, &mut memo).0)
        .max()
        .unwrap_or(0)
        .min(MAX_TREE_DEPTH)
}

/// Height of the subtree under `name`. The flag is false when the walk was cut
/// by the path guard or the depth cap; such heights depend on the path taken
/// and are not memoized.
fn height<'g>(
    graph: &'g WorkflowGraph,
    name: &'g str,
    level: usize,
    on_path: &mut HashSet<&'g str>,
    memo: &mut HashMap<&'g str, usize>,
) -> (usize, bool) {
    if let Some(&h) = memo.get(name) {
        return (h, true);
    }
    if level > MAX_TREE_DEPTH || on_path.contains(name) {
        return (0, false);
    }
    let Some(node) = graph.get(name) else {
        return (0, true);
    };

    on_path.insert(name);
    let mut deepest = 0;
    let mut complete = true;
    for cs in &node.call_sites {
        if !graph.contains(&cs.target) {
            continue;
        }
        let (h, c) = height(graph, &cs.target, level + 1, on_path, memo);
        deepest = deepest.max(h);
        complete &= c;
    }
    on_path.remove(name);

    let h = deepest + 1;
    if complete {
        memo.insert(name, h);
    }
    (h, complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{CallKind, Classification};
    use crate::graph::test_support::{calls, node};

    #[test]
    fn test_order_example_stats() {
        let order = calls(
            calls(
                node("OrderWorkflow", Classification::Workflow, "/m/wf.go"),
                "PaymentActivity",
                CallKind::Activity,
            ),
            "ShippingWorkflow",
            CallKind::ChildWorkflow,
        );
        let graph = WorkflowGraph::from_nodes(vec![
            order,
            node("PaymentActivity", Classification::Activity, "/m/act.go"),
            node("ShippingWorkflow", Classification::Workflow, "/m/ship.go"),
        ]);
        let stats = graph.stats();

        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.workflows, 2);
        assert_eq!(stats.activities, 1);
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.max_fan_out, 2);
        assert!((stats.avg_fan_out - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.orphan_nodes, 0);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.count(Classification::Workflow), 2);
    }

    #[test]
    fn test_orphans_counted() {
        let graph = WorkflowGraph::from_nodes(vec![
            node("lonely", Classification::Function, "/m/a.go"),
            node("alsoLonely", Classification::Function, "/m/b.go"),
        ]);
        assert_eq!(graph.stats().orphan_nodes, 2);
        assert_eq!(graph.stats().max_depth, 1);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        // Root -> A <-> B
        let root = calls(
            node("RootWorkflow", Classification::Workflow, "/m/r.go"),
            "AWorkflow",
            CallKind::ChildWorkflow,
        );
        let a = calls(
            node("AWorkflow", Classification::Workflow, "/m/a.go"),
            "BWorkflow",
            CallKind::ChildWorkflow,
        );
        let b = calls(
            node("BWorkflow", Classification::Workflow, "/m/b.go"),
            "AWorkflow",
            CallKind::ChildWorkflow,
        );
        let graph = WorkflowGraph::from_nodes(vec![root, a, b]);
        assert_eq!(graph.stats().max_depth, 3);
    }

    #[test]
    fn test_depth_is_capped() {
        let mut nodes = Vec::new();
        for i in 0..80 {
            let n = node(&format!("Step{i}Workflow"), Classification::Workflow, "/m/c.go");
            nodes.push(calls(n, &format!("Step{}Workflow", i + 1), CallKind::ChildWorkflow));
        }
        nodes.push(node("Step80Workflow", Classification::Workflow, "/m/c.go"));
        let graph = WorkflowGraph::from_nodes(nodes);
        assert_eq!(graph.stats().max_depth, MAX_TREE_DEPTH);
    }

    #[test]
    fn test_dangling_targets_do_not_add_depth() {
        let n = calls(
            node("LoneWorkflow", Classification::Workflow, "/m/a.go"),
            "approve",
            CallKind::Signal,
        );
        let graph = WorkflowGraph::from_nodes(vec![n]);
        assert_eq!(graph.stats().max_depth, 1);
        assert_eq!(graph.stats().total_connections, 1);
        assert_eq!(graph.stats().orphan_nodes, 0);
    }
}
