use std::path::Path;

use serde::Deserialize;

use crate::parser::framework::FrameworkPattern;

/// Name of the optional configuration file at the analyzed root.
pub const CONFIG_FILE: &str = "workflow-graph.toml";

/// Configuration loaded from `workflow-graph.toml` at the analyzed root.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Deserialize, Default)]
pub struct WorkflowGraphConfig {
    /// Glob patterns for paths to skip (beyond `.gitignore` and `exclude_dirs`).
    pub exclude: Option<Vec<String>>,
    /// Directory basenames never descended into. Replaces the defaults when set.
    pub exclude_dirs: Option<Vec<String>>,
    /// Also analyze `*_test.go` files.
    pub include_tests: Option<bool>,
    /// Extra framework call shapes, consulted after the built-in ones.
    #[serde(default)]
    pub patterns: Vec<FrameworkPattern>,
}

impl WorkflowGraphConfig {
    /// Load configuration from `workflow-graph.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}
