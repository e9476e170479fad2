//! Classification policy: decides what role a declared function plays.

use crate::graph::node::Classification;
use crate::parser::framework::FrameworkPatterns;
use crate::parser::functions::FunctionInfo;

/// Maps a declaration plus its body facts to a [`Classification`].
///
/// Implementations must be deterministic: the same declaration always gets the
/// same answer, whichever thread parses it.
pub trait Classifier: Send + Sync {
    fn classify(&self, function: &FunctionInfo, patterns: &FrameworkPatterns) -> Classification;
}

/// Name suffixes and the classification each implies.
const SUFFIXES: &[(&str, Classification)] = &[
    ("SignalHandler", Classification::SignalHandler),
    ("QueryHandler", Classification::QueryHandler),
    ("UpdateHandler", Classification::UpdateHandler),
    ("Workflow", Classification::Workflow),
    ("Activity", Classification::Activity),
    ("Signal", Classification::Signal),
    ("Query", Classification::Query),
    ("Update", Classification::Update),
];

/// Naming convention first, then body reinforcement:
///
/// 1. a known suffix decides;
/// 2. a `workflow.Context` first parameter or any workflow-side framework
///    call makes a workflow;
/// 3. a body whose only framework calls are timers makes a timer;
/// 4. everything else is a plain function.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameSuffixClassifier;

impl Classifier for NameSuffixClassifier {
    fn classify(&self, function: &FunctionInfo, patterns: &FrameworkPatterns) -> Classification {
        if let Some((_, c)) = SUFFIXES.iter().find(|(s, _)| function.name.ends_with(s)) {
            return *c;
        }

        let facts = &function.facts;
        if function
            .first_param_type()
            .is_some_and(|t| patterns.is_workflow_context(t))
            || facts.workflow_calls > 0
        {
            return Classification::Workflow;
        }
        if !facts.timers.is_empty() && facts.call_sites.is_empty() {
            return Classification::Timer;
        }
        Classification::Function
    }
}
