use std::collections::HashSet;

use crate::graph::WorkflowGraph;
use crate::graph::node::{CallKind, Node};
use crate::query::{Expansion, TreeItem, TreeItemKind};

/// Hard cap on call-hierarchy depth. Also bounds [`crate::query::stats`] depth walks.
pub const MAX_TREE_DEPTH: usize = 50;

/// Flatten the call hierarchy into display rows.
///
/// Roots are parentless nodes sorted by name. An expanded node emits the
/// in-graph targets of its call sites one level deeper. A node already on the
/// current root-to-leaf path is skipped, and nothing is emitted past
/// [`MAX_TREE_DEPTH`]. Row keys are the `/`-joined names from the root.
///
/// Under the default expansion each node's children are emitted once per
/// traversal: later rows for the same node come out collapsed with
/// `has_children` set, so dense recursive graphs stay linear in size. A key
/// set explicitly in `expansion` still expands.
pub fn call_hierarchy(graph: &WorkflowGraph, expansion: &Expansion) -> Vec<TreeItem> {
    let mut items = Vec::new();
    let mut walk = Walk::default();

    for root in graph.roots() {
        emit(
            graph,
            root,
            None,
            root.name.clone(),
            0,
            expansion,
            &mut walk,
            &mut items,
        );
    }

    items
}

#[derive(Default)]
struct Walk<'g> {
    on_path: HashSet<&'g str>,
    expanded: HashSet<&'g str>,
}

#[allow(clippy::too_many_arguments)]
fn emit<'g>(
    graph: &'g WorkflowGraph,
    node: &'g Node,
    via: Option<CallKind>,
    key: String,
    depth: usize,
    expansion: &Expansion,
    walk: &mut Walk<'g>,
    items: &mut Vec<TreeItem>,
) {
    if depth >= MAX_TREE_DEPTH || walk.on_path.contains(node.name.as_str()) {
        return;
    }
    walk.on_path.insert(&node.name);

    let children = callees(graph, node);
    let expanded = !children.is_empty()
        && match expansion.explicit(&key) {
            Some(state) => state,
            None => expansion.is_expanded(&key) && !walk.expanded.contains(node.name.as_str()),
        };
    if expanded {
        walk.expanded.insert(&node.name);
    }

    items.push(TreeItem {
        key: key.clone(),
        label: node.name.clone(),
        depth,
        kind: TreeItemKind::Node {
            name: node.name.clone(),
            classification: node.classification,
        },
        via,
        expanded,
        has_children: !children.is_empty(),
    });

    if expanded {
        for (child, kind) in children {
            let child_key = format!("{key}/{}", child.name);
            emit(
                graph,
                child,
                Some(kind),
                child_key,
                depth + 1,
                expansion,
                walk,
                items,
            );
        }
    }

    walk.on_path.remove(node.name.as_str());
}

/// Distinct in-graph call-site targets, in call-site order.
fn callees<'g>(graph: &'g WorkflowGraph, node: &Node) -> Vec<(&'g Node, CallKind)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for cs in &node.call_sites {
        if let Some(target) = graph.get(&cs.target)
            && seen.insert(target.name.as_str())
        {
            out.push((target, cs.kind));
        }
    }
    out
}
