use std::collections::HashSet;
use std::path::Path;

use tree_sitter::Node;

use crate::graph::node::{
    CallKind, CallSite, InternalCall, QueryDef, SignalDef, TimerDef, UpdateDef,
};
use crate::parser::calls::{is_boring_call, is_builtin, is_likely_local_receiver, receiver_root};
use crate::parser::framework::{FrameworkPattern, FrameworkPatterns, PatternAction};
use crate::parser::node_text;

/// Handler name recorded when a func literal is registered inline.
pub const ANONYMOUS_HANDLER: &str = "anonymous";

/// Everything learned from one function body.
#[derive(Debug, Clone, Default)]
pub struct BodyFacts {
    pub call_sites: Vec<CallSite>,
    pub signals: Vec<SignalDef>,
    pub queries: Vec<QueryDef>,
    pub updates: Vec<UpdateDef>,
    pub timers: Vec<TimerDef>,
    pub internal_calls: Vec<InternalCall>,
    /// Framework calls only a workflow can make (activities, children, signals, handlers).
    pub workflow_calls: usize,
}

/// Walk a function body (including nested func literals) and collect framework
/// and internal calls in source order.
pub fn analyze_body(
    body: Node,
    source: &[u8],
    file_path: &Path,
    owner: &str,
    patterns: &FrameworkPatterns,
) -> BodyFacts {
    let mut walker = BodyWalker {
        source,
        file_path,
        owner,
        patterns,
        facts: BodyFacts::default(),
        seen_internal: HashSet::new(),
    };
    walker.visit(body);
    walker.facts
}

struct BodyWalker<'a> {
    source: &'a [u8],
    file_path: &'a Path,
    owner: &'a str,
    patterns: &'a FrameworkPatterns,
    facts: BodyFacts,
    seen_internal: HashSet<(Option<String>, String)>,
}

impl BodyWalker<'_> {
    fn visit(&mut self, node: Node) {
        if node.kind() == "call_expression" {
            self.on_call(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn on_call(&mut self, call: Node) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        let line = call.start_position().row + 1;

        match function.kind() {
            "identifier" => {
                let name = node_text(function, self.source);
                if !is_builtin(name) {
                    self.push_internal(None, name, line);
                }
            }
            "selector_expression" => {
                let (Some(operand), Some(field)) = (
                    function.child_by_field_name("operand"),
                    function.child_by_field_name("field"),
                ) else {
                    return;
                };
                let receiver = node_text(operand, self.source);
                let method = node_text(field, self.source);

                let patterns = self.patterns;
                if let Some(pattern) = patterns.find(receiver, method) {
                    let args = arguments(call);
                    self.on_framework_call(pattern, &args, line);
                } else if operand.kind() != "call_expression"
                    && !patterns.is_framework_package(receiver_root(receiver))
                    && !is_boring_call(receiver, method)
                {
                    self.push_internal(Some(receiver), method, line);
                }
            }
            _ => {}
        }
    }

    fn on_framework_call(&mut self, pattern: &FrameworkPattern, args: &[Node], line: usize) {
        if pattern.is_workflow_side() {
            self.facts.workflow_calls += 1;
        }
        let keyed = pattern
            .field
            .as_deref()
            .and_then(|f| args.iter().find_map(|a| keyed_value(*a, f, self.source)));
        let arg = keyed.or_else(|| args.get(pattern.arg).copied());

        match pattern.action {
            PatternAction::CallSite => {
                let Some(target) = arg.and_then(|a| target_name(a, self.source)) else {
                    return;
                };
                self.facts.call_sites.push(CallSite {
                    target,
                    kind: pattern.kind.unwrap_or(CallKind::Plain),
                    file_path: self.file_path.to_path_buf(),
                    line,
                });
            }
            PatternAction::Signal => {
                let Some(name) = arg.and_then(|a| target_name(a, self.source)) else {
                    return;
                };
                self.facts.signals.push(SignalDef {
                    name,
                    handler: self.owner.to_owned(),
                    line,
                });
            }
            PatternAction::Query | PatternAction::Update => {
                let Some(name) = arg.and_then(|a| target_name(a, self.source)) else {
                    return;
                };
                let handler = pattern
                    .handler_arg
                    .and_then(|i| args.get(i).copied())
                    .and_then(|h| handler_name(h, self.source))
                    .unwrap_or_else(|| ANONYMOUS_HANDLER.to_owned());
                if pattern.action == PatternAction::Query {
                    self.facts.queries.push(QueryDef {
                        name,
                        handler,
                        line,
                    });
                } else {
                    self.facts.updates.push(UpdateDef {
                        name,
                        handler,
                        line,
                    });
                }
            }
            PatternAction::Timer => {
                let duration = arg
                    .map(|a| node_text(a, self.source).to_owned())
                    .unwrap_or_default();
                self.facts.timers.push(TimerDef {
                    duration,
                    is_sleep: pattern.sleep,
                    line,
                });
            }
        }
    }

    /// Record an internal call once, at its first occurrence.
    fn push_internal(&mut self, receiver: Option<&str>, target: &str, line: usize) {
        if target.is_empty() || target == "_" {
            return;
        }
        let key = (receiver.map(str::to_owned), target.to_owned());
        if !self.seen_internal.insert(key) {
            return;
        }
        self.facts.internal_calls.push(InternalCall {
            target: target.to_owned(),
            receiver: receiver.map(str::to_owned),
            kind: CallKind::Plain,
            file_path: self.file_path.to_path_buf(),
            line,
            likely_local: receiver.is_some_and(is_likely_local_receiver),
        });
    }
}

/// Positional arguments of a call, skipping comments.
fn arguments(call: Node) -> Vec<Node> {
    let Some(list) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Name referenced by an argument: `Foo`, `a.Foo`, `"Foo"` or `` `Foo` ``.
pub fn target_name(arg: Node, source: &[u8]) -> Option<String> {
    match arg.kind() {
        "identifier" => Some(node_text(arg, source).to_owned()),
        "selector_expression" => arg
            .child_by_field_name("field")
            .map(|f| node_text(f, source).to_owned()),
        "interpreted_string_literal" | "raw_string_literal" => {
            let text = node_text(arg, source).trim_matches(|c| c == '"' || c == '`');
            (!text.is_empty()).then(|| text.to_owned())
        }
        "parenthesized_expression" => {
            let mut cursor = arg.walk();
            let inner = arg.named_children(&mut cursor).next();
            inner.and_then(|i| target_name(i, source))
        }
        _ => None,
    }
}

/// Value of `key: value` inside a composite literal such as
/// `client.UpdateWorkflowOptions{UpdateName: "approve"}` (optionally behind `&`).
fn keyed_value<'t>(arg: Node<'t>, key: &str, source: &[u8]) -> Option<Node<'t>> {
    let literal = match arg.kind() {
        "composite_literal" => arg,
        "unary_expression" => arg
            .child_by_field_name("operand")
            .filter(|o| o.kind() == "composite_literal")?,
        _ => return None,
    };
    let body = literal.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let elements: Vec<Node> = body
        .named_children(&mut cursor)
        .filter(|e| e.kind() == "keyed_element")
        .collect();
    elements.into_iter().find_map(|element| {
        let k = unwrap_literal_element(element.child_by_field_name("key")?);
        let v = unwrap_literal_element(element.child_by_field_name("value")?);
        (node_text(k, source) == key).then_some(v)
    })
}

fn unwrap_literal_element(node: Node) -> Node {
    if node.kind() == "literal_element" {
        node.named_child(0).unwrap_or(node)
    } else {
        node
    }
}

fn handler_name(arg: Node, source: &[u8]) -> Option<String> {
    if arg.kind() == "func_literal" {
        return Some(ANONYMOUS_HANDLER.to_owned());
    }
    target_name(arg, source)
}
