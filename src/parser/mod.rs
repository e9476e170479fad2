pub mod body;
pub mod calls;
pub mod framework;
pub mod functions;

use std::cell::RefCell;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tree_sitter::{Node, Parser};

use framework::FrameworkPatterns;
use functions::{FunctionInfo, extract_functions};

// One Parser per rayon worker thread, initialised lazily on first use.
thread_local! {
    static PARSER_GO: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        p
    });
}

/// Everything extracted from one Go source file.
///
/// The tree-sitter `Tree` is not retained; it is dropped as soon as the
/// declarations and their body facts have been collected.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Name from the `package` clause.
    pub package: String,
    /// Top-level functions and methods, in source order.
    pub functions: Vec<FunctionInfo>,
}

/// Parse Go source already in memory.
///
/// # Errors
/// Returns an error if tree-sitter gives up, the file contains a syntax
/// error, or there is no `package` clause.
pub fn parse_source(path: &Path, source: &[u8], patterns: &FrameworkPatterns) -> Result<ParsedFile> {
    let tree = PARSER_GO
        .with(|p| p.borrow_mut().parse(source, None))
        .ok_or_else(|| anyhow!("tree-sitter returned None for {:?}", path))?;
    let root = tree.root_node();

    if root.has_error() {
        let line = first_error(root).map_or(0, |n| n.start_position().row + 1);
        bail!("syntax error near line {}", line);
    }

    let package = package_name(root, source).ok_or_else(|| anyhow!("missing package clause"))?;
    let functions = extract_functions(root, source, path, patterns);

    Ok(ParsedFile {
        package: package.to_owned(),
        functions,
    })
}

/// Read and parse a Go file from disk.
pub fn parse_file(path: &Path, patterns: &FrameworkPatterns) -> Result<ParsedFile> {
    let source = std::fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
    parse_source(path, &source, patterns)
}

/// Source text covered by `node`, or `""` for non-UTF-8 input.
pub fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn package_name<'a>(root: Node<'a>, source: &'a [u8]) -> Option<&'a str> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")?;
    let mut cursor = clause.walk();
    let ident = clause
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_identifier")?;
    Some(node_text(ident, source))
}

/// Earliest ERROR or MISSING node, depth-first.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error()
            && let Some(found) = first_error(child)
        {
            return Some(found);
        }
    }
    None
}
