//! On-demand lookup of functions that are not in the static graph.
//!
//! The presentation layer calls into this when a user drills into an internal
//! call whose target was never analyzed (helpers outside the filter, methods on
//! local types). The search widens in three steps and stops at the first hit:
//!
//! 1. the starting file;
//! 2. the other non-test `.go` files in the same directory, sorted;
//! 3. a breadth-first walk of the enclosing Go module (found via `go.mod`).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::AnalysisOptions;
use crate::classify::{Classifier, NameSuffixClassifier};
use crate::graph::node::{InternalCall, Node};
use crate::parser::framework::FrameworkPatterns;
use crate::parser::parse_file;
use crate::walker::is_go_source;

/// Directory basenames the module walk never enters (hidden directories are skipped too).
const SKIP_DIRS: &[&str] = &["vendor", "testdata", "test", "tests", "node_modules"];

pub struct Resolver {
    patterns: FrameworkPatterns,
    classifier: Arc<dyn Classifier>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(FrameworkPatterns::default(), Arc::new(NameSuffixClassifier))
    }
}

impl Resolver {
    pub fn new(patterns: FrameworkPatterns, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            patterns,
            classifier,
        }
    }

    /// Resolver that builds nodes exactly like the static build with `options`.
    pub fn from_options(options: &AnalysisOptions) -> Self {
        Self::new(options.patterns.clone(), Arc::clone(&options.classifier))
    }

    /// Find and analyze the function `name`, starting at `search_path` (a file
    /// or a directory). Returns `None` when nothing matches.
    pub fn resolve(&self, name: &str, search_path: &Path) -> Option<Node> {
        let (start_file, dir) = start_location(search_path);
        let start_file = start_file.as_deref();

        if let Some(file) = start_file
            && let Some(node) = self.search_file(file, name)
        {
            tracing::debug!(%name, path = %file.display(), "resolved in starting file");
            return Some(node);
        }

        for file in go_files_in(&dir) {
            if start_file.is_some_and(|s| s == file.as_path()) {
                continue;
            }
            if let Some(node) = self.search_file(&file, name) {
                tracing::debug!(%name, path = %file.display(), "resolved in directory");
                return Some(node);
            }
        }

        if let Some(module_root) = find_module_root(&dir)
            && let Some(node) = self.search_module(&module_root, &dir, name)
        {
            return Some(node);
        }

        tracing::debug!(%name, path = %search_path.display(), "not found");
        None
    }

    /// Like [`Resolver::resolve`], recording `caller` as the found node's parent.
    ///
    /// The caller gets no call site; merge the result with
    /// [`crate::graph::WorkflowGraph::merge_resolved`] to keep the edge synthetic.
    pub fn resolve_from(&self, caller: &str, name: &str, search_path: &Path) -> Option<Node> {
        let mut node = self.resolve(name, search_path)?;
        if !node.parents.iter().any(|p| p == caller) {
            node.parents.push(caller.to_owned());
        }
        Some(node)
    }

    /// Breadth-first over the module, children sorted, skipping the directory
    /// already searched (its subdirectories are still visited).
    fn search_module(&self, module_root: &Path, searched: &Path, name: &str) -> Option<Node> {
        let searched = canonical(searched);
        let mut queue = VecDeque::from([module_root.to_path_buf()]);

        while let Some(dir) = queue.pop_front() {
            if canonical(&dir) != searched {
                for file in go_files_in(&dir) {
                    if let Some(node) = self.search_file(&file, name) {
                        tracing::debug!(%name, path = %file.display(), "resolved in module");
                        return Some(node);
                    }
                }
            }
            queue.extend(child_dirs(&dir));
        }
        None
    }

    fn search_file(&self, path: &Path, name: &str) -> Option<Node> {
        let parsed = match parse_file(path, &self.patterns) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(path = %path.display(), "resolver skipped file: {err:#}");
                return None;
            }
        };
        let function = parsed.functions.into_iter().find(|f| f.name == name)?;
        Some(function.into_node(
            &parsed.package,
            path,
            self.classifier.as_ref(),
            &self.patterns,
        ))
    }
}

/// Internal calls in the order worth trying: likely-local receivers first,
/// otherwise source order.
pub fn candidate_order(calls: &[InternalCall]) -> Vec<&InternalCall> {
    let (mut local, other): (Vec<&InternalCall>, Vec<&InternalCall>) =
        calls.iter().partition(|c| c.likely_local);
    local.extend(other);
    local
}

/// Split a search path into the starting file (if any) and the directory to
/// search. Relative paths are made absolute against the working directory.
pub fn start_location(search_path: &Path) -> (Option<PathBuf>, PathBuf) {
    let path = std::path::absolute(search_path).unwrap_or_else(|_| search_path.to_path_buf());
    if path.is_dir() {
        return (None, path);
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (Some(path), dir)
}

/// Nearest ancestor of `start` (inclusive) containing a `go.mod`.
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    let start = canonical(start);
    start
        .ancestors()
        .find(|dir| dir.join("go.mod").is_file())
        .map(Path::to_path_buf)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Non-test `.go` files directly inside `dir`, sorted.
fn go_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_go_source(p, false))
        .collect();
    files.sort();
    files
}

fn child_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            !name.starts_with('.') && !SKIP_DIRS.contains(&&*name)
        })
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WorkflowGraph;
    use crate::graph::node::{CallKind, Classification};
    use crate::graph::test_support::node;
    use std::fs;
    use tempfile::TempDir;

    fn module(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for (rel, src) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, src).unwrap();
        }
        dir
    }

    const CALLER: &str = r#"package order

func OrderWorkflow(ctx workflow.Context) error {
	return validate(ctx)
}

// validate checks the order.
func validate(ctx workflow.Context) error {
	return nil
}
"#;

    #[test]
    fn test_same_file_target() {
        let dir = module(&[("order/wf.go", CALLER)]);
        let file = dir.path().join("order/wf.go");
        let node = Resolver::default().resolve("validate", &file).unwrap();

        assert_eq!(node.file_path, file);
        assert_eq!(node.line, 8);
        assert_eq!(node.package, "order");
        assert_eq!(node.description, "validate checks the order.");
        assert!(!node.external);
    }

    #[test]
    fn test_absent_target_is_none() {
        let dir = module(&[("go.mod", "module example.com/shop\n"), ("order/wf.go", CALLER)]);
        let file = dir.path().join("order/wf.go");
        assert!(Resolver::default().resolve("doesNotExist", &file).is_none());
    }

    #[test]
    fn test_sibling_file_in_directory() {
        let dir = module(&[
            ("order/wf.go", CALLER),
            ("order/helpers.go", "package order\n\nfunc loadOrder() {}\n"),
            ("order/helpers_test.go", "package order\n\nfunc testOnly() {}\n"),
        ]);
        let file = dir.path().join("order/wf.go");
        let resolver = Resolver::default();
        let node = resolver.resolve("loadOrder", &file).unwrap();
        assert_eq!(node.file_path, dir.path().join("order/helpers.go"));
        assert!(resolver.resolve("testOnly", &file).is_none());
    }

    #[test]
    fn test_relative_start_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let (file, dir) = start_location(Path::new("wf.go"));
        assert_eq!(file, Some(cwd.join("wf.go")));
        assert_eq!(dir, cwd);

        let (file, dir) = start_location(Path::new("."));
        assert!(file.is_none());
        assert!(dir.is_absolute());
    }

    #[test]
    fn test_directory_search_path() {
        let dir = module(&[("order/helpers.go", "package order\n\nfunc loadOrder() {}\n")]);
        let node = Resolver::default()
            .resolve("loadOrder", &dir.path().join("order"))
            .unwrap();
        assert_eq!(node.line, 3);
    }

    #[test]
    fn test_module_walk_requires_go_mod() {
        let files = [
            ("order/wf.go", CALLER),
            ("billing/charge.go", "package billing\n\nfunc ChargeCard() {}\n"),
        ];
        let without = module(&files);
        let file = without.path().join("order/wf.go");
        assert!(Resolver::default().resolve("ChargeCard", &file).is_none());

        let with = module(&[files[0], files[1], ("go.mod", "module example.com/shop\n")]);
        let file = with.path().join("order/wf.go");
        let node = Resolver::default().resolve("ChargeCard", &file).unwrap();
        assert_eq!(node.package, "billing");
    }

    #[test]
    fn test_module_walk_is_breadth_first_and_skips_noise() {
        let dir = module(&[
            ("go.mod", "module example.com/shop\n"),
            ("order/wf.go", CALLER),
            ("a/deep/nested/x.go", "package nested\n\nfunc shared() {}\n"),
            ("z/y.go", "package z\n\nfunc shared() {}\n"),
            ("vendor/lib/v.go", "package lib\n\nfunc vendored() {}\n"),
            ("testdata/t.go", "package t\n\nfunc fixture() {}\n"),
            (".hidden/h.go", "package h\n\nfunc hidden() {}\n"),
            ("tests/e2e.go", "package e2e\n\nfunc e2e() {}\n"),
        ]);
        let file = dir.path().join("order/wf.go");
        let resolver = Resolver::default();

        assert_eq!(resolver.resolve("shared", &file).unwrap().package, "z");
        for name in ["vendored", "fixture", "hidden", "e2e"] {
            assert!(resolver.resolve(name, &file).is_none(), "{name} should be skipped");
        }
    }

    #[test]
    fn test_module_walk_visits_subpackages_of_searched_dir() {
        let dir = module(&[
            ("go.mod", "module example.com/shop\n"),
            ("order/wf.go", CALLER),
            ("order/internal/calc.go", "package internal\n\nfunc total() {}\n"),
        ]);
        let file = dir.path().join("order/wf.go");
        let node = Resolver::default().resolve("total", &file).unwrap();
        assert_eq!(node.package, "internal");
    }

    #[test]
    fn test_resolve_from_merges_as_synthetic_parent() {
        let dir = module(&[("order/wf.go", CALLER)]);
        let file = dir.path().join("order/wf.go");
        let resolved = Resolver::default()
            .resolve_from("OrderWorkflow", "validate", &file)
            .unwrap();
        assert_eq!(resolved.parents, vec!["OrderWorkflow"]);
        assert_eq!(resolved.classification, Classification::Workflow);

        let mut graph = WorkflowGraph::from_nodes(vec![node(
            "OrderWorkflow",
            Classification::Workflow,
            "/m/order/wf.go",
        )]);
        assert!(graph.merge_resolved(resolved.clone()));
        assert!(!graph.merge_resolved(resolved));

        let merged = graph.get("validate").unwrap();
        assert_eq!(merged.parents, vec!["OrderWorkflow"]);
        assert!(graph.is_synthetic_parent("validate", "OrderWorkflow"));
        assert!(graph.get("OrderWorkflow").unwrap().call_sites.is_empty());
    }

    #[test]
    fn test_candidate_order_prefers_local_receivers() {
        let call = |target: &str, local: bool| InternalCall {
            target: target.into(),
            receiver: local.then(|| "s".to_owned()),
            kind: CallKind::Plain,
            file_path: PathBuf::from("/m/a.go"),
            line: 1,
            likely_local: local,
        };
        let calls = vec![call("a", false), call("b", true), call("c", false), call("d", true)];
        let order: Vec<&str> = candidate_order(&calls)
            .into_iter()
            .map(|c| c.target.as_str())
            .collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_find_module_root() {
        let dir = module(&[("go.mod", "module x\n"), ("a/b/c.go", "package b\n")]);
        let root = find_module_root(&dir.path().join("a/b")).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }
}
