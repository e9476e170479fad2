use anyhow::Result;
use regex::RegexBuilder;

use crate::graph::WorkflowGraph;
use crate::graph::node::{Classification, Node};

/// Find nodes in `graph` whose name matches the regex `pattern`.
///
/// - `case_insensitive`: enable case-insensitive regex matching
/// - `kind_filter`: if non-empty, only include nodes whose classification string is in this list
///
/// Returns results sorted by file path then line number; external stubs sort first.
pub fn find_nodes<'g>(
    graph: &'g WorkflowGraph,
    pattern: &str,
    case_insensitive: bool,
    kind_filter: &[String],
) -> Result<Vec<&'g Node>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid name pattern '{}': {}", pattern, e))?;

    let kinds = parse_kinds(kind_filter)?;

    let mut results: Vec<&Node> = graph
        .nodes()
        .filter(|n| re.is_match(&n.name))
        .filter(|n| kinds.is_empty() || kinds.contains(&n.classification))
        .collect();

    results.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line.cmp(&b.line))
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(results)
}

fn parse_kinds(kind_filter: &[String]) -> Result<Vec<Classification>> {
    kind_filter
        .iter()
        .map(|k| {
            Classification::from_str_loose(k).ok_or_else(|| {
                let valid: Vec<&str> = Classification::ALL.iter().map(|c| c.as_str()).collect();
                anyhow::anyhow!("unknown kind '{}' (expected one of: {})", k, valid.join(", "))
            })
        })
        .collect()
}
