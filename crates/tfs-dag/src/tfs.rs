//! Typed feature structures: a dag root plus its quick-check vector, and
//! the rule-application operations built on them.

use crate::arena::{Edge, NodeId};
use crate::jxchg::JxchgError;
use crate::quick_check::QcVector;
use crate::restrictor::{RestrictCursor, Restrictor};
use crate::session::Session;
use crate::subsume::Subsumption;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use tracing::trace;

/// A feature structure handle.
///
/// Equality needs the session's arena, see [`Session::tfs_equals`]. Keyed
/// collections can use [`Tfs::qc_vector`]: structurally equal feature
/// structures have equal vectors.
#[derive(Clone, Debug)]
pub struct Tfs {
    root: NodeId,
    qc: QcVector,
}

impl Tfs {
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn qc_vector(&self) -> &QcVector {
        &self.qc
    }
}

impl Session<'_> {
    /// Wrap a committed dag, computing its quick-check vector.
    pub fn tfs(&self, root: NodeId) -> Tfs {
        Tfs {
            root,
            qc: self.grammar.quick_check().vector(&self.arena, root),
        }
    }

    pub fn parse_tfs(&mut self, text: &str) -> Result<Tfs, JxchgError> {
        let root = self.parse(text)?;
        Ok(self.tfs(root))
    }

    pub fn unify(&mut self, a: &Tfs, b: &Tfs) -> Option<Tfs> {
        let root = self.unify_dags(a.root, b.root)?;
        Some(self.tfs(root))
    }

    /// Unify `passive` into the `arg`-th element of `active`'s `ARGS` list and
    /// copy the whole of `active`.
    pub fn unify_at_arg(&mut self, active: &Tfs, passive: &Tfs, arg: usize) -> Option<Tfs> {
        let checkpoint = self.arena.checkpoint();
        if !self.unify_only_at_arg(active, passive, arg) {
            return None;
        }
        let root = self.copy_compacted(active.root, None, checkpoint)?;
        Some(self.tfs(root))
    }

    /// [`Session::unify_at_arg`] without the copy; see [`Session::unify_only`].
    pub fn unify_only_at_arg(&mut self, active: &Tfs, passive: &Tfs, arg: usize) -> bool {
        match self.nth_arg(active, arg) {
            Some(sub) => self.unify_only(sub, passive.root),
            None => false,
        }
    }

    /// Unify into an argument, then copy `active` through `restrictor`.
    pub fn unify_restrict(
        &mut self,
        active: &Tfs,
        passive: &Tfs,
        arg: usize,
        restrictor: &Restrictor,
    ) -> Option<Tfs> {
        let checkpoint = self.arena.checkpoint();
        if !self.unify_only_at_arg(active, passive, arg) {
            return None;
        }
        let root = self.copy_compacted(active.root, Some(restrictor), checkpoint)?;
        Some(self.tfs(root))
    }

    /// Restricted copy of a feature structure.
    pub fn copy_restrict(&mut self, tfs: &Tfs, restrictor: &Restrictor) -> Option<Tfs> {
        let root = self.copy_result(tfs.root, Some(restrictor)).ok()?;
        Some(self.tfs(root))
    }

    /// Restrict the committed structure of `tfs` in place.
    ///
    /// Nodes shared between several restrictor positions receive every
    /// restriction that reaches them.
    pub fn restrict_in_place(&mut self, tfs: &mut Tfs, restrictor: &Restrictor) {
        let mut seen = FxHashSet::default();
        self.restrict_rec(tfs.root, restrictor, restrictor.start(), &mut seen);
        self.arena.invalidate();
        tfs.qc = self.grammar.quick_check().vector(&self.arena, tfs.root);
    }

    fn restrict_rec(
        &mut self,
        node: NodeId,
        restrictor: &Restrictor,
        cursor: RestrictCursor,
        seen: &mut FxHashSet<(NodeId, RestrictCursor)>,
    ) {
        if !seen.insert((node, cursor)) {
            return;
        }
        let ty = restrictor.generalize(cursor, self.arena.node_type(node), self.grammar.lattice());
        self.arena.set_node_type(node, ty);
        let kept: SmallVec<[Edge; 4]> = self
            .arena
            .edges(node)
            .iter()
            .copied()
            .filter(|edge| restrictor.keeps(cursor, edge.feature))
            .collect();
        self.arena.set_edges(node, kept.clone());
        for edge in &kept {
            let sub = restrictor.descend(cursor, edge.feature);
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.restrict_rec(edge.target, restrictor, sub, seen)
            });
        }
    }

    /// Unfill the committed structure of `tfs`, see [`Session::unfill`].
    pub fn unfill_tfs(&mut self, tfs: &mut Tfs) {
        self.unfill(tfs.root);
        tfs.qc = self.grammar.quick_check().vector(&self.arena, tfs.root);
    }

    /// Restrict `tfs` in place for storage as a passive item: difference
    /// lists are normalized and values the restrictor does not mention are
    /// unfilled.
    pub fn restrict_special(&mut self, tfs: &mut Tfs, restrictor: &Restrictor) {
        self.restrict_special_dag(tfs.root, restrictor);
        tfs.qc = self.grammar.quick_check().vector(&self.arena, tfs.root);
    }

    pub fn clone_tfs(&mut self, tfs: &Tfs) -> Tfs {
        let root = self.clone_dag(tfs.root);
        Tfs {
            root,
            qc: tfs.qc.clone(),
        }
    }

    pub fn tfs_equals(&mut self, a: &Tfs, b: &Tfs) -> bool {
        a.qc == b.qc && self.dags_equal(a.root, b.root)
    }

    pub fn tfs_subsumes(&mut self, general: &Tfs, specific: &Tfs) -> bool {
        self.subsumes(general.root, specific.root)
    }

    pub fn tfs_subsumes_bidirectional(&mut self, a: &Tfs, b: &Tfs) -> Subsumption {
        self.subsumes_bidirectional(a.root, b.root)
    }

    // -------------------------------------------------------------------------
    // Argument lists
    // -------------------------------------------------------------------------

    /// Node of the `n`-th (0-based) element of the `ARGS` list.
    pub fn nth_arg(&self, tfs: &Tfs, n: usize) -> Option<NodeId> {
        let special = self.grammar.special_features();
        let (args, first, rest) = (special.args?, special.first?, special.rest?);
        let mut list = self.arena.current_value(tfs.root, args)?;
        for _ in 0..n {
            list = self.arena.current_value(list, rest)?;
        }
        self.arena.current_value(list, first)
    }

    pub fn nth_arg_tfs(&self, tfs: &Tfs, n: usize) -> Option<Tfs> {
        self.nth_arg(tfs, n).map(|root| self.tfs(root))
    }

    /// Length of the `ARGS` list.
    pub fn arity(&self, tfs: &Tfs) -> usize {
        let args = self.grammar.special_features().args;
        args.and_then(|args| self.arena.current_value(tfs.root, args))
            .map_or(0, |list| self.list_length(list))
    }

    /// Number of `FIRST` elements along the `REST` chain from `list`.
    pub fn list_length(&self, list: NodeId) -> usize {
        let special = self.grammar.special_features();
        let (Some(first), Some(rest)) = (special.first, special.rest) else {
            return 0;
        };
        let mut length = 0;
        let mut current = Some(self.arena.deref(list));
        while let Some(node) = current {
            if self.arena.current_value(node, first).is_none() || length > self.arena.len() {
                break;
            }
            length += 1;
            current = self.arena.current_value(node, rest);
        }
        length
    }

    /// Index of the argument whose `KEY-ARG` value is `+`.
    pub fn key_arg(&self, tfs: &Tfs) -> Option<usize> {
        let key_arg = self.grammar.special_features().key_arg?;
        let marker = self.grammar.key_arg_marker()?;
        (0..self.arity(tfs)).find(|&n| {
            self.nth_arg(tfs, n)
                .and_then(|arg| self.arena.current_value(arg, key_arg))
                .is_some_and(|value| self.arena.current_type(value) == marker)
        })
    }

    // -------------------------------------------------------------------------
    // Quick check
    // -------------------------------------------------------------------------

    /// Quick-check types of the `n`-th argument, BOTTOM throughout if there
    /// is no such argument. Valid for entangled structures as well.
    pub fn arg_qc_vector(&self, tfs: &Tfs, n: usize) -> QcVector {
        let quick_check = self.grammar.quick_check();
        match self.nth_arg(tfs, n) {
            Some(arg) => quick_check.vector(&self.arena, arg),
            None => QcVector::from_types(
                std::iter::repeat(tfs_common::TypeId::BOTTOM).take(quick_check.len()),
            ),
        }
    }

    /// Cheap pre-filter: false means `passive` certainly does not unify
    /// with the argument whose vector is `active_arg`.
    pub fn qc_compatible(&self, active_arg: &QcVector, passive: &Tfs) -> bool {
        let compatible = active_arg.compatible(&passive.qc, self.grammar.lattice());
        trace!(target: "tfs::episode", compatible, "quick check");
        compatible
    }
}

#[cfg(test)]
#[path = "../tests/tfs_tests.rs"]
mod tests;
