use std::path::{Path, PathBuf};

/// Directory basenames skipped when none are configured.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &["vendor", ".git", "node_modules"];

/// Which files a walk collects.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Directory basenames never descended into.
    pub exclude_dirs: Vec<String>,
    /// Glob patterns matched against the root-relative path and each of its components.
    pub exclude: Vec<String>,
    pub include_tests: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            include_tests: false,
        }
    }
}

/// True for `.go` files, excluding `*_test.go` unless `include_tests` is set.
pub fn is_go_source(path: &Path, include_tests: bool) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && (include_tests || !name.ends_with("_test.go"))
}

/// Walk `root` and collect eligible Go source files, sorted by path.
///
/// Respects `.gitignore` rules (even outside a git repository), never enters
/// an excluded directory, and applies glob exclusions.
pub fn walk_go_files(root: &Path, options: &WalkOptions) -> Vec<PathBuf> {
    let exclude_dirs = options.exclude_dirs.clone();
    let patterns: Vec<glob::Pattern> = options
        .exclude
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!("ignoring invalid exclude pattern '{p}': {err}");
                None
            }
        })
        .collect();

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| exclude_dirs.iter().any(|d| d == name)))
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("{err}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_none_or(|ft| ft.is_dir()) {
            continue;
        }
        if !is_go_source(path, options.include_tests) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if is_excluded(relative, &patterns) {
            continue;
        }

        tracing::trace!(path = %path.display(), "discovered");
        files.push(path.to_path_buf());
    }

    files.sort();
    files
}

fn is_excluded(relative: &Path, patterns: &[glob::Pattern]) -> bool {
    let path_str = relative.to_string_lossy();
    patterns.iter().any(|pattern| {
        pattern.matches(&path_str)
            || relative
                .components()
                .any(|c| c.as_os_str().to_str().is_some_and(|s| pattern.matches(s)))
    })
}
