use crate::graph::node::CallKind;

/// Weight of a directed caller -> callee edge in the call-site index.
///
/// Only statically discovered call sites become edges. Synthetic parents
/// recorded by the runtime resolver are kept outside the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub kind: CallKind,
    /// 1-based line of the call expression in the caller's file.
    pub line: usize,
}
