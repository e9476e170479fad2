use serde::{Deserialize, Serialize};

use crate::graph::node::CallKind;

/// What a recognized framework call contributes to its enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternAction {
    /// Outbound call site of `kind`; `arg` is the target argument.
    CallSite,
    /// The enclosing function listens on a signal; `arg` is the signal name.
    Signal,
    /// Query handler registration; `arg` is the query name, `handler_arg` the handler.
    Query,
    /// Update handler registration; `arg` is the update name, `handler_arg` the handler.
    Update,
    /// Durable timer or sleep; `arg` is the duration.
    Timer,
}

/// One recognized call shape: `receiver.method(args...)`.
///
/// `receiver = None` matches any receiver (client handles are usually named
/// freely: `c`, `client`, `temporalClient`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkPattern {
    pub method: String,
    #[serde(default)]
    pub receiver: Option<String>,
    pub action: PatternAction,
    #[serde(default)]
    pub kind: Option<CallKind>,
    /// Zero-based index of the argument holding the target, name or duration.
    pub arg: usize,
    #[serde(default)]
    pub handler_arg: Option<usize>,
    #[serde(default)]
    pub sleep: bool,
    /// Options-struct key holding the value (`UpdateName` in
    /// `client.UpdateWorkflowOptions{...}`). A composite-literal argument with
    /// this key wins over the positional `arg`.
    #[serde(default)]
    pub field: Option<String>,
}

impl FrameworkPattern {
    pub fn call_site(receiver: Option<&str>, method: &str, kind: CallKind, arg: usize) -> Self {
        Self {
            method: method.to_owned(),
            receiver: receiver.map(str::to_owned),
            action: PatternAction::CallSite,
            kind: Some(kind),
            arg,
            handler_arg: None,
            sleep: false,
            field: None,
        }
    }

    /// Same as [`FrameworkPattern::call_site`], also reading `field` from an options literal.
    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_owned());
        self
    }

    pub fn signal(receiver: &str, method: &str, name_arg: usize) -> Self {
        Self {
            method: method.to_owned(),
            receiver: Some(receiver.to_owned()),
            action: PatternAction::Signal,
            kind: None,
            arg: name_arg,
            handler_arg: None,
            sleep: false,
            field: None,
        }
    }

    pub fn handler(
        receiver: &str,
        method: &str,
        action: PatternAction,
        name_arg: usize,
        handler_arg: usize,
    ) -> Self {
        Self {
            method: method.to_owned(),
            receiver: Some(receiver.to_owned()),
            action,
            kind: None,
            arg: name_arg,
            handler_arg: Some(handler_arg),
            sleep: false,
            field: None,
        }
    }

    pub fn timer(receiver: &str, method: &str, duration_arg: usize, sleep: bool) -> Self {
        Self {
            method: method.to_owned(),
            receiver: Some(receiver.to_owned()),
            action: PatternAction::Timer,
            kind: None,
            arg: duration_arg,
            handler_arg: None,
            sleep,
            field: None,
        }
    }

    fn matches(&self, receiver: &str, method: &str) -> bool {
        self.method == method && self.receiver.as_deref().is_none_or(|r| r == receiver)
    }

    /// True for calls only a workflow function can make.
    pub fn is_workflow_side(&self) -> bool {
        self.receiver.is_some() && self.action != PatternAction::Timer
    }
}

/// The table of framework call shapes the analyzer recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkPatterns {
    pub patterns: Vec<FrameworkPattern>,
    /// Package identifiers whose calls are framework plumbing, never internal calls.
    pub framework_packages: Vec<String>,
    /// Parameter types that mark a function as workflow code.
    pub workflow_context_types: Vec<String>,
}

impl Default for FrameworkPatterns {
    /// Temporal Go SDK call shapes.
    fn default() -> Self {
        use PatternAction::{Query, Update};
        let wf = Some("workflow");
        Self {
            patterns: vec![
                FrameworkPattern::call_site(wf, "ExecuteActivity", CallKind::Activity, 1),
                FrameworkPattern::call_site(wf, "ExecuteLocalActivity", CallKind::Activity, 1),
                FrameworkPattern::call_site(wf, "ExecuteChildWorkflow", CallKind::ChildWorkflow, 1),
                FrameworkPattern::call_site(wf, "SignalExternalWorkflow", CallKind::Signal, 3),
                FrameworkPattern::signal("workflow", "GetSignalChannel", 1),
                FrameworkPattern::signal("workflow", "GetSignalChannelWithOptions", 1),
                FrameworkPattern::handler("workflow", "SetQueryHandler", Query, 1, 2),
                FrameworkPattern::handler("workflow", "SetQueryHandlerWithOptions", Query, 1, 2),
                FrameworkPattern::handler("workflow", "SetUpdateHandler", Update, 1, 2),
                FrameworkPattern::handler("workflow", "SetUpdateHandlerWithOptions", Update, 1, 2),
                FrameworkPattern::timer("workflow", "NewTimer", 1, false),
                FrameworkPattern::timer("workflow", "NewTimerWithOptions", 1, false),
                FrameworkPattern::timer("workflow", "Sleep", 1, true),
                FrameworkPattern::call_site(None, "SignalWorkflow", CallKind::Signal, 3),
                FrameworkPattern::call_site(None, "SignalWithStartWorkflow", CallKind::Signal, 2),
                FrameworkPattern::call_site(None, "QueryWorkflow", CallKind::Query, 3),
                FrameworkPattern::call_site(None, "UpdateWorkflow", CallKind::Update, 3)
                    .with_field("UpdateName"),
            ],
            framework_packages: ["workflow", "activity", "temporal", "client", "worker"]
                .into_iter()
                .map(String::from)
                .collect(),
            workflow_context_types: vec!["workflow.Context".to_owned()],
        }
    }
}

impl FrameworkPatterns {
    /// Find the pattern for `receiver.method(...)`. The first match in table order wins.
    pub fn find(&self, receiver: &str, method: &str) -> Option<&FrameworkPattern> {
        self.patterns.iter().find(|p| p.matches(receiver, method))
    }

    pub fn is_framework_package(&self, receiver: &str) -> bool {
        self.framework_packages.iter().any(|p| p == receiver)
    }

    pub fn is_workflow_context(&self, type_name: &str) -> bool {
        self.workflow_context_types.iter().any(|t| t == type_name)
    }

    /// Append user-supplied patterns. They are consulted after the defaults.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = FrameworkPattern>) {
        self.patterns.extend(extra);
    }
}
