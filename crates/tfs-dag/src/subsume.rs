//! Subsumption and structural equality of committed dags.
//!
//! Pairings are kept in scratch slots: the forward slot maps a node of the
//! first dag to its partner in the second, the copy slot maps back. A node
//! paired twice with different partners breaks the coreference condition for
//! that direction.

use crate::arena::{CopySlot, Edge, NodeId};
use crate::failure::FailureKind;
use crate::session::Session;
use bitflags::bitflags;
use smallvec::SmallVec;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};

bitflags! {
    /// Outcome of a bidirectional subsumption check.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Subsumption: u8 {
        /// The first structure subsumes the second.
        const THIS_MORE_GENERAL = 1;
        /// The second structure subsumes the first.
        const ARG_MORE_GENERAL = 2;
        const EQUAL = Self::THIS_MORE_GENERAL.bits() | Self::ARG_MORE_GENERAL.bits();
    }
}

impl Session<'_> {
    /// Check subsumption in both directions in one walk.
    pub fn subsumes_bidirectional(&mut self, a: NodeId, b: NodeId) -> Subsumption {
        if let Some(log) = self.failures.as_mut() {
            log.clear();
        }
        let result = self.subsumes_bi_rec(a, b, Subsumption::EQUAL);
        self.arena.invalidate();
        result
    }

    fn subsumes_bi_rec(&mut self, a: NodeId, b: NodeId, mut result: Subsumption) -> Subsumption {
        if result.contains(Subsumption::THIS_MORE_GENERAL) {
            match self.arena.forward(a) {
                None => self.arena.set_forward(a, b),
                Some(partner) if partner == b => return result,
                Some(_) => {
                    self.record_forward(a, FailureKind::Variable);
                    result.remove(Subsumption::THIS_MORE_GENERAL);
                    if result.is_empty() {
                        return result;
                    }
                }
            }
        }
        if result.contains(Subsumption::ARG_MORE_GENERAL) {
            match self.arena.copy_slot(b) {
                CopySlot::Node(partner) if partner == a => return result,
                CopySlot::Node(_) | CopySlot::InProgress => {
                    self.record_backward(a, FailureKind::Variable);
                    result.remove(Subsumption::ARG_MORE_GENERAL);
                    if result.is_empty() {
                        return result;
                    }
                }
                CopySlot::Empty => self.arena.set_copy_slot(b, CopySlot::Node(a)),
            }
        }

        let type1 = self.arena.current_type(a);
        let type2 = self.arena.current_type(b);
        if type1 != type2 {
            let lattice = self.grammar.lattice();
            if !lattice.subsumes(type1, type2) {
                self.record_forward(a, FailureKind::Type);
                result.remove(Subsumption::THIS_MORE_GENERAL);
                if result.is_empty() {
                    return result;
                }
            }
            if !lattice.subsumes(type2, type1) {
                self.record_backward(a, FailureKind::Type);
                result.remove(Subsumption::ARG_MORE_GENERAL);
                if result.is_empty() {
                    return result;
                }
            }
        }

        let edges1: SmallVec<[Edge; 8]> = self.arena.edges(a).iter().copied().collect();
        let edges2: SmallVec<[Edge; 8]> = self.arena.edges(b).iter().copied().collect();
        let (mut i, mut j) = (0, 0);
        while i < edges1.len() || j < edges2.len() {
            let f1 = edges1.get(i).map(|e| e.feature);
            let f2 = edges2.get(j).map(|e| e.feature);
            match (f1, f2) {
                (Some(x), Some(y)) if x == y => {
                    result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.subsumes_bi_rec(edges1[i].target, edges2[j].target, result)
                    });
                    if result.is_empty() {
                        return result;
                    }
                    i += 1;
                    j += 1;
                }
                // A feature only in the first structure: it cannot be more general.
                (Some(x), Some(y)) if x < y => {
                    self.record_forward(a, FailureKind::Feature);
                    result.remove(Subsumption::THIS_MORE_GENERAL);
                    i += 1;
                }
                (Some(_), None) => {
                    self.record_forward(a, FailureKind::Feature);
                    result.remove(Subsumption::THIS_MORE_GENERAL);
                    i += 1;
                }
                _ => {
                    self.record_backward(a, FailureKind::Feature);
                    result.remove(Subsumption::ARG_MORE_GENERAL);
                    j += 1;
                }
            }
            if result.is_empty() {
                return result;
            }
        }
        result
    }

    /// Whether `general` subsumes `specific`.
    pub fn subsumes(&mut self, general: NodeId, specific: NodeId) -> bool {
        let result = self.subsumes_rec(general, specific);
        self.arena.invalidate();
        result
    }

    fn subsumes_rec(&mut self, a: NodeId, b: NodeId) -> bool {
        match self.arena.forward(a) {
            None => self.arena.set_forward(a, b),
            Some(partner) => return partner == b,
        }
        let type1 = self.arena.current_type(a);
        let type2 = self.arena.current_type(b);
        if type1 != type2 && !self.grammar.lattice().subsumes(type1, type2) {
            return false;
        }

        let edges1: SmallVec<[Edge; 8]> = self.arena.edges(a).iter().copied().collect();
        let edges2: SmallVec<[Edge; 8]> = self.arena.edges(b).iter().copied().collect();
        let mut j = 0;
        for e1 in &edges1 {
            while j < edges2.len() && edges2[j].feature < e1.feature {
                j += 1;
            }
            let Some(e2) = edges2.get(j).filter(|e2| e2.feature == e1.feature) else {
                return false;
            };
            let target = e2.target;
            let sub = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.subsumes_rec(e1.target, target)
            });
            if !sub {
                return false;
            }
            j += 1;
        }
        true
    }

    /// Structural equality including the coreference pattern.
    pub fn dags_equal(&mut self, a: NodeId, b: NodeId) -> bool {
        let result = self.equals_rec(a, b);
        self.arena.invalidate();
        result
    }

    fn equals_rec(&mut self, a: NodeId, b: NodeId) -> bool {
        let fs1 = self.arena.forward(a);
        let fs2 = self.arena.forward(b);
        match (fs1, fs2) {
            (None, None) => {
                self.arena.set_forward(b, a);
                self.arena.set_forward(a, a);
            }
            _ => return fs1 == fs2,
        }
        if self.arena.node_type(a) != self.arena.node_type(b) {
            return false;
        }
        let edges1: SmallVec<[Edge; 8]> = self.arena.edges(a).iter().copied().collect();
        let edges2: SmallVec<[Edge; 8]> = self.arena.edges(b).iter().copied().collect();
        if edges1.len() != edges2.len() {
            return false;
        }
        for (e1, e2) in edges1.iter().zip(&edges2) {
            if e1.feature != e2.feature {
                return false;
            }
            let equal = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.equals_rec(e1.target, e2.target)
            });
            if !equal {
                return false;
            }
        }
        true
    }

    fn record_forward(&mut self, node: NodeId, kind: FailureKind) {
        if let Some(log) = self.failures.as_mut() {
            log.forward.insert(node, kind);
        }
    }

    fn record_backward(&mut self, node: NodeId, kind: FailureKind) {
        if let Some(log) = self.failures.as_mut() {
            log.backward.insert(node, kind);
        }
    }
}

#[cfg(test)]
#[path = "../tests/subsume_tests.rs"]
mod tests;
