pub mod call_tree;
pub mod cycles;
pub mod find;
pub mod output;
pub mod package_tree;
pub mod stats;

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::node::{CallKind, Classification};

/// What a materialized tree row stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeItemKind {
    Node {
        name: String,
        classification: Classification,
    },
    Directory {
        path: String,
    },
}

/// One row of a flattened, depth-annotated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    /// Stable key used to look up this row's expansion state.
    pub key: String,
    pub label: String,
    pub depth: usize,
    pub kind: TreeItemKind,
    /// Edge kind from the parent row, for call-hierarchy children.
    pub via: Option<CallKind>,
    pub expanded: bool,
    pub has_children: bool,
}

/// Per-session expansion state: key -> expanded, with a fallback for unknown keys.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    states: HashMap<String, bool>,
    default_expanded: bool,
}

impl Expansion {
    /// Everything collapsed unless set otherwise.
    pub fn collapsed() -> Self {
        Self::default()
    }

    /// Everything expanded unless set otherwise.
    pub fn expanded() -> Self {
        Self {
            states: HashMap::new(),
            default_expanded: true,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, expanded: bool) {
        self.states.insert(key.into(), expanded);
    }

    pub fn toggle(&mut self, key: &str) {
        let next = !self.is_expanded(key);
        self.states.insert(key.to_owned(), next);
    }

    /// The state recorded for `key`, ignoring the default.
    pub fn explicit(&self, key: &str) -> Option<bool> {
        self.states.get(key).copied()
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.states.get(key).copied().unwrap_or(self.default_expanded)
    }
}

impl From<HashMap<String, bool>> for Expansion {
    fn from(states: HashMap<String, bool>) -> Self {
        Self {
            states,
            default_expanded: false,
        }
    }
}
