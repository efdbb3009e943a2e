//! Destructive unification.
//!
//! A unification step never touches committed structure. It records its
//! effect in the scratch slots of the current generation: the promoted type
//! of the surviving node, forward pointers from absorbed nodes, and pending
//! edges the survivor gained. The result stays entangled with its inputs
//! until it is copied out (see `copy.rs`); bumping the generation undoes
//! everything at once.

use crate::arena::{Edge, NodeId};
use crate::failure::FailureKind;
use crate::restrictor::Restrictor;
use crate::session::Session;
use smallvec::SmallVec;
use tfs_common::TypeId;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE, WELLFORMED_DEPTH_WARNING};
use tracing::{trace, warn};

enum Completion {
    /// The type has no prototype with features.
    Skipped,
    Unified,
    Failed,
}

impl Session<'_> {
    /// Unify `a` and `b` and copy the result out.
    ///
    /// Returns `None` on a type clash, a failing prototype, or a cyclic
    /// result. The inputs are left unchanged either way.
    pub fn unify_dags(&mut self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.unify_dags_restricted(a, b, None)
    }

    /// Like [`Session::unify_dags`], copying the result through
    /// `restrictor`.
    pub fn unify_dags_restricted(
        &mut self,
        a: NodeId,
        b: NodeId,
        restrictor: Option<&Restrictor>,
    ) -> Option<NodeId> {
        let checkpoint = self.arena.checkpoint();
        let result = if self.unify_step(a, b) {
            self.copy_compacted(a, restrictor, checkpoint)
        } else {
            self.arena.invalidate();
            self.arena.truncate(checkpoint);
            None
        };
        trace!(target: "tfs::episode", %a, %b, success = result.is_some(), "unify");
        result
    }

    /// Copy the result out, then reclaim what the episode allocated since
    /// `checkpoint` (completed prototypes) so that only the copy remains.
    pub(crate) fn copy_compacted(
        &mut self,
        root: NodeId,
        restrictor: Option<&Restrictor>,
        checkpoint: usize,
    ) -> Option<NodeId> {
        let start = self.arena.checkpoint();
        match self.copy_result(root, restrictor) {
            Ok(copy) => Some(self.arena.compact(checkpoint, start, copy)),
            Err(_) => {
                self.arena.truncate(checkpoint);
                None
            }
        }
    }

    /// Unify without copying, for several unifications into one structure.
    ///
    /// On success the entangled result is left in place and the caller
    /// finishes with [`Session::copy_result`] (or [`Session::invalidate`]).
    /// On failure the episode is abandoned.
    pub fn unify_only(&mut self, a: NodeId, b: NodeId) -> bool {
        let checkpoint = self.arena.checkpoint();
        let unified = self.unify_step(a, b);
        if !unified {
            self.arena.invalidate();
            self.arena.truncate(checkpoint);
        }
        trace!(target: "tfs::episode", %a, %b, unified, "unify only");
        unified
    }

    /// Whether `a` and `b` unify. Cycles in the result are not detected.
    pub fn is_unifiable(&mut self, a: NodeId, b: NodeId) -> bool {
        let checkpoint = self.arena.checkpoint();
        let unified = self.unify_step(a, b);
        self.arena.invalidate();
        self.arena.truncate(checkpoint);
        unified
    }

    pub(crate) fn unify_step(&mut self, a: NodeId, b: NodeId) -> bool {
        let in1 = self.arena.deref(a);
        let in2 = self.arena.deref(b);
        if in1 == in2 {
            return true;
        }

        let type1 = self.arena.current_type(in1);
        let type2 = self.arena.current_type(in2);
        let unified = self.grammar.lattice().unify(type1, type2);
        if unified.is_bottom() {
            let kind = if in1 != a || in2 != b {
                FailureKind::Variable
            } else {
                FailureKind::Type
            };
            self.record(a, b, kind);
            return false;
        }
        self.arena.set_current_type(in1, unified);

        let has1 = self.arena.has_current_edges(in1);
        let has2 = self.arena.has_current_edges(in2);
        // Completion is needed only when a promoted node brings edges the
        // prototype of its new type has not seen.
        let complete = !((type1 == unified && type2 == unified)
            || (!has1 && !has2)
            || (type1 == unified && has1)
            || (type2 == unified && has2));
        if complete {
            match self.make_wellformed(in1, unified) {
                Completion::Skipped => {}
                Completion::Unified => return self.unify_step(in1, in2),
                Completion::Failed => {
                    self.record(a, b, FailureKind::Wellformedness);
                    return false;
                }
            }
        }

        if !has2 {
            self.arena.set_forward(in2, in1);
            return true;
        }
        if !has1 {
            self.arena.set_current_type(in2, unified);
            self.arena.set_forward(in1, in2);
            return true;
        }

        let incoming: SmallVec<[Edge; 8]> = self.arena.current_edges(in2).collect();
        self.arena.set_forward(in2, in1);
        for edge in incoming {
            // The survivor may itself be absorbed by a nested step.
            let survivor = self.arena.deref(in1);
            match self.arena.find_current_edge(survivor, edge.feature) {
                Some(existing) => {
                    let merged = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.unify_step(existing, edge.target)
                    });
                    if !merged {
                        self.record(a, b, FailureKind::Feature);
                        return false;
                    }
                }
                None => self.arena.push_pending(survivor, edge),
            }
        }
        true
    }

    /// Unify `node` with a fresh copy of the prototype of `ty`.
    fn make_wellformed(&mut self, node: NodeId, ty: TypeId) -> Completion {
        let grammar = self.grammar;
        let Some((prototypes, root)) = grammar.prototype(ty) else {
            return Completion::Skipped;
        };
        if prototypes.edges(root).is_empty() {
            return Completion::Skipped;
        }
        let copy = self.arena.import(prototypes, root);

        self.wellformed_depth += 1;
        if self.wellformed_depth == WELLFORMED_DEPTH_WARNING {
            warn!(
                target: "tfs::episode",
                depth = self.wellformed_depth,
                ty = %grammar.lattice().type_name(ty).unwrap_or_default(),
                "deeply nested prototype completion; the grammar may define a self-referential type"
            );
        }
        let unified = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.unify_step(node, copy)
        });
        self.wellformed_depth -= 1;

        if unified {
            Completion::Unified
        } else {
            Completion::Failed
        }
    }
}

#[cfg(test)]
#[path = "../tests/unify_tests.rs"]
mod tests;
