use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{Classifier, NameSuffixClassifier};
use crate::config::WorkflowGraphConfig;
use crate::graph::node::{Classification, Node};
use crate::graph::{NameCollision, NodeFilter, WorkflowGraph};
use crate::parser::framework::FrameworkPatterns;
use crate::parser::{ParsedFile, parse_file};
use crate::walker::{WalkOptions, walk_go_files};

/// Everything a static analysis run needs.
#[derive(Clone)]
pub struct AnalysisOptions {
    pub root: PathBuf,
    pub walk: WalkOptions,
    pub filter: NodeFilter,
    pub patterns: FrameworkPatterns,
    pub classifier: Arc<dyn Classifier>,
}

impl AnalysisOptions {
    /// Defaults: skip `vendor`, `.git` and `node_modules`, no tests, no
    /// filters, Temporal call shapes, name-suffix classification.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            walk: WalkOptions::default(),
            filter: NodeFilter::default(),
            patterns: FrameworkPatterns::default(),
            classifier: Arc::new(NameSuffixClassifier),
        }
    }

    /// Layer settings from `workflow-graph.toml` over the current options.
    pub fn with_config(mut self, config: WorkflowGraphConfig) -> Self {
        if let Some(exclude) = config.exclude {
            self.walk.exclude = exclude;
        }
        if let Some(dirs) = config.exclude_dirs {
            self.walk.exclude_dirs = dirs;
        }
        if let Some(include_tests) = config.include_tests {
            self.walk.include_tests = include_tests;
        }
        self.patterns.extend(config.patterns);
        self
    }
}

/// A non-fatal problem met while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildWarning {
    /// The file could not be read or parsed and was skipped.
    ParseFailed { path: PathBuf, reason: String },
    /// A later declaration reused an existing node name and was dropped.
    NameCollision(NameCollision),
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::ParseFailed { path, reason } => {
                write!(f, "skipped {}: {}", path.display(), reason)
            }
            BuildWarning::NameCollision(c) => write!(
                f,
                "duplicate name {}: kept {}:{}, dropped {}:{}",
                c.name,
                c.kept_path.display(),
                c.kept_line,
                c.dropped_path.display(),
                c.dropped_line
            ),
        }
    }
}

/// Result of a static analysis run.
pub struct BuildOutput {
    pub graph: WorkflowGraph,
    pub warnings: Vec<BuildWarning>,
    /// Files successfully parsed.
    pub files_analyzed: usize,
}

/// Walk `options.root`, parse every eligible Go file and build the graph.
///
/// Files are parsed in parallel and reduced serially in sorted path order, so
/// which declaration wins a name collision never depends on scheduling.
///
/// # Errors
/// Fails only when the root is missing, unreadable or not a directory.
pub fn build_graph(options: &AnalysisOptions) -> Result<BuildOutput> {
    let started = Instant::now();
    let root = validate_root(&options.root)?;

    let files = walk_go_files(&root, &options.walk);
    tracing::info!(root = %root.display(), files = files.len(), "discovered Go files");

    let parsed: Vec<(PathBuf, Result<ParsedFile>)> = files
        .par_iter()
        .map(|path| (path.clone(), parse_file(path, &options.patterns)))
        .collect();

    let mut nodes = Vec::new();
    let mut warnings = Vec::new();
    let mut files_analyzed = 0;
    for (path, result) in parsed {
        match result {
            Ok(file) => {
                files_analyzed += 1;
                tracing::debug!(path = %path.display(), functions = file.functions.len(), "parsed");
                for function in file.functions {
                    nodes.push(function.into_node(
                        &file.package,
                        &path,
                        options.classifier.as_ref(),
                        &options.patterns,
                    ));
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "skipping file: {err:#}");
                warnings.push(BuildWarning::ParseFailed {
                    path,
                    reason: format!("{err:#}"),
                });
            }
        }
    }

    promote_handlers(&mut nodes);
    let declared: HashSet<String> = nodes.iter().map(|n| n.name.clone()).collect();
    let mut nodes = options.filter.apply(nodes);
    add_external_stubs(&mut nodes, &declared, &options.filter);

    let graph = WorkflowGraph::from_nodes(nodes);
    for collision in graph.collisions() {
        tracing::warn!(
            name = %collision.name,
            kept = %collision.kept_path.display(),
            dropped = %collision.dropped_path.display(),
            "duplicate function name"
        );
        warnings.push(BuildWarning::NameCollision(collision.clone()));
    }

    tracing::info!(
        nodes = graph.len(),
        connections = graph.stats().total_connections,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph built"
    );

    Ok(BuildOutput {
        graph,
        warnings,
        files_analyzed,
    })
}

fn validate_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .with_context(|| format!("cannot access analysis root {:?}", root))?;
    if !canonical.is_dir() {
        bail!("analysis root {:?} is not a directory", root);
    }
    std::fs::read_dir(&canonical)
        .with_context(|| format!("cannot read analysis root {:?}", root))?;
    Ok(canonical)
}

/// Plain functions registered as query or update handlers take the handler role.
fn promote_handlers(nodes: &mut [Node]) {
    let mut query_handlers = HashSet::new();
    let mut update_handlers = HashSet::new();
    for node in nodes.iter() {
        query_handlers.extend(node.queries.iter().map(|q| q.handler.clone()));
        update_handlers.extend(node.updates.iter().map(|u| u.handler.clone()));
    }

    for node in nodes.iter_mut() {
        if node.classification != Classification::Function {
            continue;
        }
        if query_handlers.contains(&node.name) {
            node.classification = Classification::QueryHandler;
        } else if update_handlers.contains(&node.name) {
            node.classification = Classification::UpdateHandler;
        }
    }
}

/// Add a stub node for every activity or child-workflow target that no file
/// declares. Stubs the filter rejects are not created and the call sites
/// pointing at them are pruned.
fn add_external_stubs(nodes: &mut Vec<Node>, declared: &HashSet<String>, filter: &NodeFilter) {
    let mut stubs: BTreeMap<String, Node> = BTreeMap::new();
    let mut rejected: HashSet<String> = HashSet::new();
    for node in nodes.iter_mut() {
        node.call_sites.retain(|cs| {
            if declared.contains(&cs.target) || stubs.contains_key(&cs.target) {
                return true;
            }
            if rejected.contains(&cs.target) {
                return false;
            }
            let Some(classification) = cs.kind.stub_classification() else {
                return true;
            };
            let stub = Node::external_stub(&cs.target, classification);
            if !filter.matches(&stub) {
                rejected.insert(cs.target.clone());
                return false;
            }
            stubs.insert(cs.target.clone(), stub);
            true
        });
    }
    for (name, stub) in stubs {
        tracing::debug!(%name, classification = %stub.classification, "external target");
        nodes.push(stub);
    }
}
