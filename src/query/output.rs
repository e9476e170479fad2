use std::io::IsTerminal;
use std::path::Path;

use crate::builder::BuildWarning;
use crate::cli::OutputFormat;
use crate::graph::WorkflowGraph;
use crate::graph::node::{Classification, Node};
use crate::query::cycles::CallCycle;
use crate::query::stats::GraphStats;
use crate::query::{TreeItem, TreeItemKind};

fn header(s: &str) -> String {
    if std::io::stdout().is_terminal() {
        format!("\x1b[1m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn relative<'a>(path: &'a Path, root: &Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy()
}

fn location(node: &Node, root: &Path) -> String {
    if node.external {
        "(external)".to_string()
    } else {
        format!("{}:{}", relative(&node.file_path, root), node.line)
    }
}

/// Print build warnings to stderr so stdout stays clean for JSON consumers.
pub fn print_warnings(warnings: &[BuildWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

// ---------------------------------------------------------------------------
// Stats output
// ---------------------------------------------------------------------------

/// Format and print graph statistics to stdout according to the selected output format.
pub fn format_stats(stats: &GraphStats, files: usize, format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            println!("files {}", files);
            println!("nodes {} external {}", stats.total_nodes, stats.external_nodes);
            let counts: Vec<String> = Classification::ALL
                .iter()
                .map(|c| format!("{} {}", c.as_str(), stats.count(*c)))
                .collect();
            println!("{}", counts.join(" "));
            println!(
                "connections {} max_depth {} avg_fan_out {:.2} max_fan_out {} orphans {}",
                stats.total_connections,
                stats.max_depth,
                stats.avg_fan_out,
                stats.max_fan_out,
                stats.orphan_nodes,
            );
        }

        OutputFormat::Table => {
            println!("{}", header("=== Workflow Graph ==="));
            println!("Files:    {}", files);
            println!("Nodes:    {}", stats.total_nodes);
            println!();
            println!("{}", header("--- Classification ---"));
            for c in Classification::ALL {
                println!("  {:<16}{}", format!("{}:", c.as_str()), stats.count(c));
            }
            println!("  {:<16}{}", "external:", stats.external_nodes);
            println!();
            println!("{}", header("--- Shape ---"));
            println!("  Connections:  {}", stats.total_connections);
            println!("  Max depth:    {}", stats.max_depth);
            println!("  Avg fan-out:  {:.2}", stats.avg_fan_out);
            println!("  Max fan-out:  {}", stats.max_fan_out);
            println!("  Orphans:      {}", stats.orphan_nodes);
        }

        OutputFormat::Json => {
            let mut json = serde_json::to_value(stats).unwrap_or_default();
            if let Some(obj) = json.as_object_mut() {
                obj.insert("file_count".into(), files.into());
            }
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }
}

// ---------------------------------------------------------------------------
// Tree output
// ---------------------------------------------------------------------------

/// Format and print materialized tree rows, indented two spaces per level.
pub fn format_tree(items: &[TreeItem], format: &OutputFormat) {
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            let use_color = format_is_table(format) && std::io::stdout().is_terminal();
            for item in items {
                let indent = "  ".repeat(item.depth);
                match &item.kind {
                    TreeItemKind::Directory { .. } => {
                        if use_color {
                            println!("{indent}\x1b[1m{}\x1b[0m", item.label);
                        } else {
                            println!("{indent}{}", item.label);
                        }
                    }
                    TreeItemKind::Node { classification, .. } => {
                        let via = item
                            .via
                            .map(|k| format!(" via {}", k.as_str()))
                            .unwrap_or_default();
                        let more = if item.has_children && !item.expanded { " …" } else { "" };
                        println!("{indent}{} [{}]{via}{more}", item.label, classification);
                    }
                }
            }
        }

        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

fn format_is_table(format: &OutputFormat) -> bool {
    matches!(format, OutputFormat::Table)
}

// ---------------------------------------------------------------------------
// Node output
// ---------------------------------------------------------------------------

/// Format and print find results.
pub fn format_find_results(nodes: &[&Node], format: &OutputFormat, root: &Path) {
    match format {
        OutputFormat::Compact => {
            for n in nodes {
                println!("def {} {} {}", n.name, location(n, root), n.classification);
            }
            println!("{} nodes found", nodes.len());
        }

        OutputFormat::Table => {
            let name_w = nodes.iter().map(|n| n.name.len()).max().unwrap_or(4).max(4);
            let loc_w = nodes
                .iter()
                .map(|n| location(n, root).len())
                .max()
                .unwrap_or(8)
                .max(8);
            println!(
                "{}",
                header(&format!(
                    "{:<name_w$}  {:<loc_w$}  {}",
                    "NAME", "LOCATION", "KIND"
                ))
            );
            println!("{}", "-".repeat(name_w + loc_w + 16));
            for n in nodes {
                println!(
                    "{:<name_w$}  {:<loc_w$}  {}",
                    n.name,
                    location(n, root),
                    n.classification
                );
            }
        }

        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = nodes
                .iter()
                .map(|n| {
                    serde_json::json!({
                        "name": n.name,
                        "kind": n.classification,
                        "package": n.package,
                        "file": relative(&n.file_path, root),
                        "line": n.line,
                        "external": n.external,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }
}

/// Format and print everything known about one node.
pub fn format_node(node: &Node, graph: Option<&WorkflowGraph>, format: &OutputFormat, root: &Path) {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(node).unwrap_or_default());
        return;
    }

    println!("{}", header(&format!("{} [{}]", node.name, node.classification)));
    println!("  location: {}", location(node, root));
    if !node.package.is_empty() {
        println!("  package:  {}", node.package);
    }
    match &node.receiver {
        Some(recv) => println!("  func ({recv}) {}{}", node.name, node.signature()),
        None if !node.external => println!("  func {}{}", node.name, node.signature()),
        None => {}
    }
    if !node.description.is_empty() {
        println!("  {}", node.description);
    }

    if !node.parents.is_empty() {
        println!("{}", header("callers"));
        for parent in &node.parents {
            let synthetic = graph.is_some_and(|g| g.is_synthetic_parent(&node.name, parent));
            let marker = if synthetic { " (resolved)" } else { "" };
            println!("  {parent}{marker}");
        }
    }
    if !node.call_sites.is_empty() {
        println!("{}", header("calls"));
        for cs in &node.call_sites {
            println!("  {} {} line {}", cs.kind, cs.target, cs.line);
        }
    }
    if !node.internal_calls.is_empty() {
        println!("{}", header("internal calls"));
        for call in &node.internal_calls {
            let local = if call.likely_local { " (local)" } else { "" };
            println!("  {} line {}{local}", call.display_target(), call.line);
        }
    }
    if !node.signals.is_empty() {
        println!("{}", header("signals"));
        for s in &node.signals {
            println!("  {} line {}", s.name, s.line);
        }
    }
    if !node.queries.is_empty() {
        println!("{}", header("queries"));
        for q in &node.queries {
            println!("  {} -> {} line {}", q.name, q.handler, q.line);
        }
    }
    if !node.updates.is_empty() {
        println!("{}", header("updates"));
        for u in &node.updates {
            println!("  {} -> {} line {}", u.name, u.handler, u.line);
        }
    }
    if !node.timers.is_empty() {
        println!("{}", header("timers"));
        for t in &node.timers {
            let what = if t.is_sleep { "sleep" } else { "timer" };
            println!("  {what} {} line {}", t.duration, t.line);
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle output
// ---------------------------------------------------------------------------

/// Format and print recursive call groups.
pub fn format_cycles(cycles: &[CallCycle], format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for cycle in cycles {
                println!("cycle {}", cycle.nodes.join(" -> "));
            }
            println!("{} cycles found", cycles.len());
        }

        OutputFormat::Table => {
            for (i, cycle) in cycles.iter().enumerate() {
                println!("{}", header(&format!("=== Cycle {} ===", i + 1)));
                let unique = &cycle.nodes[..cycle.nodes.len().saturating_sub(1)];
                for name in unique {
                    println!("  {name}");
                }
                println!();
            }
            println!("{} cycles found", cycles.len());
        }

        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(cycles).unwrap_or_default());
        }
    }
}
