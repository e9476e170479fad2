use petgraph::algo::kosaraju_scc;
use serde::Serialize;

use crate::graph::WorkflowGraph;

/// A group of nodes that reach each other through call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallCycle {
    /// Member names sorted; the first is repeated at the end to close the cycle.
    pub nodes: Vec<String>,
}

/// Detect recursive call groups.
///
/// Runs Kosaraju's SCC algorithm over the call-site edge index. Components with
/// more than one node are cycles, as is a single node that calls itself.
/// Synthetic resolver parents are not edges and never form a cycle.
///
/// Returns cycles sorted by their first node name.
pub fn find_cycles(graph: &WorkflowGraph) -> Vec<CallCycle> {
    let index = graph.call_index();

    let mut cycles: Vec<CallCycle> = kosaraju_scc(index)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| index.contains_edge(n, n)))
        .map(|scc| {
            let mut nodes: Vec<String> = scc.iter().map(|&n| index[n].clone()).collect();
            nodes.sort();
            let first = nodes[0].clone();
            nodes.push(first);
            CallCycle { nodes }
        })
        .collect();

    cycles.sort_by(|a, b| a.nodes[0].cmp(&b.nodes[0]));
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{CallKind, Classification};
    use crate::graph::test_support::{calls, node};

    #[test]
    fn test_mutual_recursion_detected() {
        let ping = calls(
            node("PingWorkflow", Classification::Workflow, "/m/p.go"),
            "PongWorkflow",
            CallKind::ChildWorkflow,
        );
        let pong = calls(
            node("PongWorkflow", Classification::Workflow, "/m/q.go"),
            "PingWorkflow",
            CallKind::ChildWorkflow,
        );
        let root = calls(
            node("RootWorkflow", Classification::Workflow, "/m/r.go"),
            "PingWorkflow",
            CallKind::ChildWorkflow,
        );
        let graph = WorkflowGraph::from_nodes(vec![root, ping, pong]);

        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].nodes,
            vec!["PingWorkflow", "PongWorkflow", "PingWorkflow"]
        );
    }

    #[test]
    fn test_self_call_is_a_cycle() {
        let again = calls(
            node("ContinueWorkflow", Classification::Workflow, "/m/c.go"),
            "ContinueWorkflow",
            CallKind::ChildWorkflow,
        );
        let graph = WorkflowGraph::from_nodes(vec![again]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["ContinueWorkflow", "ContinueWorkflow"]);
    }

    #[test]
    fn test_acyclic_graph_has_none() {
        let order = calls(
            node("OrderWorkflow", Classification::Workflow, "/m/o.go"),
            "PaymentActivity",
            CallKind::Activity,
        );
        let graph = WorkflowGraph::from_nodes(vec![
            order,
            node("PaymentActivity", Classification::Activity, "/m/a.go"),
        ]);
        assert!(find_cycles(&graph).is_empty());
    }
}
