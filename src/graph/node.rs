use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The role a function plays in a workflow application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Workflow,
    Activity,
    Signal,
    SignalHandler,
    Query,
    QueryHandler,
    Update,
    UpdateHandler,
    /// A non-workflow function whose only framework interaction is a timer or sleep.
    Timer,
    /// Plain internal function.
    Function,
}

impl Classification {
    /// Every classification, in display order.
    pub const ALL: [Classification; 10] = [
        Classification::Workflow,
        Classification::Activity,
        Classification::Signal,
        Classification::SignalHandler,
        Classification::Query,
        Classification::QueryHandler,
        Classification::Update,
        Classification::UpdateHandler,
        Classification::Timer,
        Classification::Function,
    ];

    /// Lowercase string used in output and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Workflow => "workflow",
            Classification::Activity => "activity",
            Classification::Signal => "signal",
            Classification::SignalHandler => "signal_handler",
            Classification::Query => "query",
            Classification::QueryHandler => "query_handler",
            Classification::Update => "update",
            Classification::UpdateHandler => "update_handler",
            Classification::Timer => "timer",
            Classification::Function => "function",
        }
    }

    /// Parse the lowercase form produced by [`Classification::as_str`].
    pub fn from_str_loose(s: &str) -> Option<Classification> {
        let s = s.trim().to_lowercase();
        Classification::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Sort priority inside a package listing: workflows first, then activities,
    /// then signal, query and update families, then everything else.
    pub fn display_priority(&self) -> u8 {
        match self {
            Classification::Workflow => 0,
            Classification::Activity => 1,
            Classification::Signal | Classification::SignalHandler => 2,
            Classification::Query | Classification::QueryHandler => 3,
            Classification::Update | Classification::UpdateHandler => 4,
            Classification::Timer | Classification::Function => 5,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a call site reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Activity,
    ChildWorkflow,
    Signal,
    Query,
    Update,
    /// Ordinary function or method call.
    Plain,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Activity => "activity",
            CallKind::ChildWorkflow => "child_workflow",
            CallKind::Signal => "signal",
            CallKind::Query => "query",
            CallKind::Update => "update",
            CallKind::Plain => "plain",
        }
    }

    /// Classification given to a stub node created for an undeclared target of this kind.
    pub fn stub_classification(&self) -> Option<Classification> {
        match self {
            CallKind::Activity => Some(Classification::Activity),
            CallKind::ChildWorkflow => Some(Classification::Workflow),
            _ => None,
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed parameter. Unnamed Go parameters carry an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// Outbound edge to a framework-recognized target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Target function name, or the signal/query/update name for message calls.
    pub target: String,
    pub kind: CallKind,
    pub file_path: PathBuf,
    /// 1-based line of the call expression.
    pub line: usize,
}

/// Outbound edge to a non-framework function, resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalCall {
    pub target: String,
    /// Receiver text for `recv.Method()` calls.
    pub receiver: Option<String>,
    pub kind: CallKind,
    pub file_path: PathBuf,
    pub line: usize,
    /// Receiver naming suggests a method on a local type (`s.load()`, `repo.Get()`).
    pub likely_local: bool,
}

impl InternalCall {
    /// `recv.Target` for method calls, `Target` otherwise.
    pub fn display_target(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{recv}.{}", self.target),
            None => self.target.clone(),
        }
    }
}

/// A signal the owning workflow listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDef {
    pub name: String,
    pub handler: String,
    pub line: usize,
}

/// A query handler registered by the owning workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDef {
    pub name: String,
    pub handler: String,
    pub line: usize,
}

/// An update handler registered by the owning workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDef {
    pub name: String,
    pub handler: String,
    pub line: usize,
}

/// A durable timer or sleep inside the owning function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDef {
    /// Duration expression exactly as written (`5*time.Minute`).
    pub duration: String,
    pub is_sleep: bool,
    pub line: usize,
}

/// One analyzed function or method and its relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub classification: Classification,
    pub package: String,
    pub file_path: PathBuf,
    /// 1-based declaration line; 0 for external stubs.
    pub line: usize,
    pub description: String,
    pub receiver: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub call_sites: Vec<CallSite>,
    pub internal_calls: Vec<InternalCall>,
    /// Names of nodes whose call sites reference this node. Maintained by
    /// [`crate::graph::WorkflowGraph`]; never edited directly.
    pub parents: Vec<String>,
    pub signals: Vec<SignalDef>,
    pub queries: Vec<QueryDef>,
    pub updates: Vec<UpdateDef>,
    pub timers: Vec<TimerDef>,
    /// Referenced by a framework call but not declared in the analyzed tree.
    pub external: bool,
}

impl Node {
    /// Stub for a framework target referenced but never declared under the analyzed root.
    pub fn external_stub(name: &str, classification: Classification) -> Self {
        Self {
            name: name.to_owned(),
            classification,
            package: String::new(),
            file_path: PathBuf::new(),
            line: 0,
            description: String::new(),
            receiver: None,
            parameters: Vec::new(),
            return_type: String::new(),
            call_sites: Vec::new(),
            internal_calls: Vec::new(),
            parents: Vec::new(),
            signals: Vec::new(),
            queries: Vec::new(),
            updates: Vec::new(),
            timers: Vec::new(),
            external: true,
        }
    }

    /// No inbound and no outbound call-site edges.
    pub fn is_orphan(&self) -> bool {
        self.parents.is_empty() && self.call_sites.is_empty()
    }

    /// Number of outbound call sites.
    pub fn fan_out(&self) -> usize {
        self.call_sites.len()
    }

    /// Go-style signature text: `(ctx workflow.Context, id string) (string, error)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.type_name.clone()
                } else {
                    format!("{} {}", p.name, p.type_name)
                }
            })
            .collect();
        if self.return_type.is_empty() {
            format!("({})", params.join(", "))
        } else {
            format!("({}) {}", params.join(", "), self.return_type)
        }
    }
}
