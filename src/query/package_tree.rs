use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::graph::WorkflowGraph;
use crate::graph::node::Node;
use crate::query::{Expansion, TreeItem, TreeItemKind};

/// Directory segment under which external stub nodes are listed.
pub const EXTERNAL_SEGMENT: &str = "(external)";

// ---------------------------------------------------------------------------
// Directory trie
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirTrie<'g> {
    children: BTreeMap<String, DirTrie<'g>>,
    nodes: Vec<&'g Node>,
}

impl<'g> DirTrie<'g> {
    fn insert(&mut self, rel_dir: &Path, node: &'g Node) {
        let mut cursor = self;
        for component in rel_dir.components() {
            let segment = component.as_os_str().to_string_lossy().into_owned();
            cursor = cursor.children.entry(segment).or_default();
        }
        cursor.nodes.push(node);
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.nodes.is_empty()
    }

    /// Merge every chain of single-child, node-less directories into one segment.
    fn collapse(self) -> Self {
        let children = self
            .children
            .into_iter()
            .map(|(mut name, mut sub)| {
                while sub.nodes.is_empty() && sub.children.len() == 1 {
                    let Some((child_name, grandchild)) = sub.children.pop_first() else {
                        break;
                    };
                    name = format!("{name}/{child_name}");
                    sub = grandchild;
                }
                (name, sub.collapse())
            })
            .collect();
        Self {
            children,
            nodes: self.nodes,
        }
    }
}

/// Longest directory prefix shared by every path.
fn common_dir(dirs: &[&Path]) -> PathBuf {
    let Some(first) = dirs.first() else {
        return PathBuf::new();
    };
    let mut prefix: Vec<Component> = first.components().collect();
    for dir in &dirs[1..] {
        let shared = prefix
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.iter().collect()
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

/// Flatten the graph into a package (directory) hierarchy.
///
/// Nodes are grouped by their file's directory relative to the longest common
/// directory of all declared nodes. Single-child directory chains that own no
/// nodes collapse into one `a/b/c` row. Each level lists child directories
/// lexicographically, then its nodes by classification priority and name.
pub fn package_hierarchy(graph: &WorkflowGraph, expansion: &Expansion) -> Vec<TreeItem> {
    let declared: Vec<&Node> = graph
        .nodes()
        .filter(|n| !n.external && !n.file_path.as_os_str().is_empty())
        .collect();
    let dirs: Vec<&Path> = declared
        .iter()
        .map(|n| n.file_path.parent().unwrap_or(Path::new("")))
        .collect();
    let base = common_dir(&dirs);

    let mut trie = DirTrie::default();
    for (&node, &dir) in declared.iter().zip(dirs.iter()) {
        let rel = dir.strip_prefix(&base).unwrap_or(dir);
        trie.insert(rel, node);
    }
    for node in graph.nodes().filter(|n| n.external || n.file_path.as_os_str().is_empty()) {
        trie.insert(Path::new(EXTERNAL_SEGMENT), node);
    }

    let trie = trie.collapse();
    let mut items = Vec::new();
    render(&trie, "", 0, expansion, &mut items);
    items
}

fn render(
    trie: &DirTrie,
    prefix: &str,
    depth: usize,
    expansion: &Expansion,
    items: &mut Vec<TreeItem>,
) {
    for (name, sub) in &trie.children {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let key = format!("dir:{path}");
        let has_children = !sub.is_empty();
        let expanded = has_children && expansion.is_expanded(&key);

        items.push(TreeItem {
            key,
            label: format!("{name}/"),
            depth,
            kind: TreeItemKind::Directory { path: path.clone() },
            via: None,
            expanded,
            has_children,
        });

        if expanded {
            render(sub, &path, depth + 1, expansion, items);
        }
    }

    let mut nodes = trie.nodes.clone();
    nodes.sort_by(|a, b| {
        a.classification
            .display_priority()
            .cmp(&b.classification.display_priority())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in nodes {
        items.push(TreeItem {
            key: format!("node:{}", node.name),
            label: node.name.clone(),
            depth,
            kind: TreeItemKind::Node {
                name: node.name.clone(),
                classification: node.classification,
            },
            via: None,
            expanded: false,
            has_children: false,
        });
    }
}
