//! Optional record of where unification failed.

use crate::arena::NodeId;
use rustc_hash::FxHashMap;
use std::fmt;

/// Why a unification step failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The greatest lower bound of the two types is BOTTOM.
    Type,
    /// The result contains a cycle.
    Cycle,
    /// A feature value failed to unify.
    Feature,
    /// Two coreferenced paths led to incompatible values.
    Variable,
    /// Unification with a type prototype failed.
    Wellformedness,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Type => "type clash",
            FailureKind::Cycle => "cycle",
            FailureKind::Feature => "feature clash",
            FailureKind::Variable => "coreference clash",
            FailureKind::Wellformedness => "wellformedness",
        })
    }
}

/// Nodes at which a failure was observed, keyed separately for the
/// two operands of the failing unification.
#[derive(Clone, Debug, Default)]
pub struct FailureLog {
    pub forward: FxHashMap<NodeId, FailureKind>,
    pub backward: FxHashMap<NodeId, FailureKind>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, left: NodeId, right: NodeId, kind: FailureKind) {
        self.forward.insert(left, kind);
        self.backward.insert(right, kind);
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
    }
}
