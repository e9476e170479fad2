use std::path::Path;

use tree_sitter::Node;

use crate::classify::Classifier;
use crate::graph::node::{self, Parameter};
use crate::parser::body::{BodyFacts, analyze_body};
use crate::parser::framework::FrameworkPatterns;
use crate::parser::node_text;

/// Longest description kept on a node, ellipsis included.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// A declared function or method, before classification.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    /// Receiver type for methods (`*OrderService`).
    pub receiver: Option<String>,
    pub parameters: Vec<Parameter>,
    /// Result exactly as written: `error`, `(string, error)`, or empty.
    pub return_type: String,
    /// 1-based line of the `func` keyword.
    pub line: usize,
    pub description: String,
    pub facts: BodyFacts,
}

impl FunctionInfo {
    /// Type of the first parameter, if any.
    pub fn first_param_type(&self) -> Option<&str> {
        self.parameters.first().map(|p| p.type_name.as_str())
    }

    /// Classify and turn into a graph node. Parents are left empty.
    pub fn into_node(
        self,
        package: &str,
        file_path: &Path,
        classifier: &dyn Classifier,
        patterns: &FrameworkPatterns,
    ) -> node::Node {
        let classification = classifier.classify(&self, patterns);
        let BodyFacts {
            call_sites,
            signals,
            queries,
            updates,
            timers,
            internal_calls,
            ..
        } = self.facts;
        node::Node {
            name: self.name,
            classification,
            package: package.to_owned(),
            file_path: file_path.to_path_buf(),
            line: self.line,
            description: self.description,
            receiver: self.receiver,
            parameters: self.parameters,
            return_type: self.return_type,
            call_sites,
            internal_calls,
            parents: Vec::new(),
            signals,
            queries,
            updates,
            timers,
            external: false,
        }
    }
}

/// Collect every top-level function and method declaration under `root`.
pub fn extract_functions(
    root: Node,
    source: &[u8],
    file_path: &Path,
    patterns: &FrameworkPatterns,
) -> Vec<FunctionInfo> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        let receiver = match decl.kind() {
            "function_declaration" => None,
            "method_declaration" => decl
                .child_by_field_name("receiver")
                .and_then(|r| receiver_type(r, source)),
            _ => continue,
        };
        let Some(name_node) = decl.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_owned();

        let parameters = decl
            .child_by_field_name("parameters")
            .map(|p| parameters(p, source))
            .unwrap_or_default();
        let return_type = decl
            .child_by_field_name("result")
            .map(|r| node_text(r, source).to_owned())
            .unwrap_or_default();
        let facts = decl
            .child_by_field_name("body")
            .map(|b| analyze_body(b, source, file_path, &name, patterns))
            .unwrap_or_default();

        out.push(FunctionInfo {
            name,
            receiver,
            parameters,
            return_type,
            line: decl.start_position().row + 1,
            description: truncate_description(&doc_comment(decl, source)),
            facts,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

fn receiver_type(list: Node, source: &[u8]) -> Option<String> {
    let mut cursor = list.walk();
    let decl = list
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration")?;
    decl.child_by_field_name("type")
        .map(|t| node_text(t, source).to_owned())
}

/// Flatten a parameter list. `a, b string` yields two parameters; unnamed
/// parameters get an empty name; variadics keep their `...` prefix.
fn parameters(list: Node, source: &[u8]) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        let type_name = match decl.kind() {
            "parameter_declaration" => decl
                .child_by_field_name("type")
                .map(|t| node_text(t, source).to_owned())
                .unwrap_or_default(),
            "variadic_parameter_declaration" => decl
                .child_by_field_name("type")
                .map(|t| format!("...{}", node_text(t, source)))
                .unwrap_or_default(),
            _ => continue,
        };

        let mut name_cursor = decl.walk();
        let names: Vec<&str> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| node_text(n, source))
            .collect();
        if names.is_empty() {
            out.push(Parameter {
                name: String::new(),
                type_name,
            });
        } else {
            out.extend(names.into_iter().map(|name| Parameter {
                name: name.to_owned(),
                type_name: type_name.clone(),
            }));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Doc comments
// ---------------------------------------------------------------------------

/// The contiguous comment block directly above `decl`, markers stripped and
/// lines joined with single spaces. A blank line breaks the block.
fn doc_comment(decl: Node, source: &[u8]) -> String {
    let mut blocks = Vec::new();
    let mut next_row = decl.start_position().row;
    let mut current = decl.prev_named_sibling();

    while let Some(comment) = current {
        if comment.kind() != "comment" || comment.end_position().row + 1 != next_row {
            break;
        }
        blocks.push(node_text(comment, source));
        next_row = comment.start_position().row;
        current = comment.prev_named_sibling();
    }
    blocks.reverse();

    let lines: Vec<&str> = blocks
        .iter()
        .flat_map(|block| comment_lines(block))
        .filter(|line| !line.is_empty() && !line.starts_with("go:") && !line.starts_with("nolint"))
        .collect();
    lines.join(" ")
}

fn comment_lines(block: &str) -> Vec<&str> {
    if let Some(line) = block.strip_prefix("//") {
        return vec![line.trim()];
    }
    let inner = block
        .strip_prefix("/*")
        .and_then(|b| b.strip_suffix("*/"))
        .unwrap_or(block);
    inner
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .collect()
}

/// Cap a description at [`MAX_DESCRIPTION_CHARS`], replacing the tail with `...`.
pub fn truncate_description(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    out.push_str("...");
    out
}
