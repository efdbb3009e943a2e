//! Unfilling: dropping feature values that completion would restore.
//!
//! An edge can go when its value is an empty node of the feature's maximal
//! appropriate type and the node carrying it has the introducing type (any
//! type, when sloppy). Values reached along more than one path stay, since
//! dropping them would lose the coreference.
//!
//! Both walks here edit committed structure and end any open episode.

use crate::arena::{Edge, NodeId};
use crate::restrictor::{RestrictCursor, RestrictMode, Restrictor};
use crate::session::Session;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tfs_common::limits::{MAX_SLASH_DEPTH, STACK_GROWTH, STACK_RED_ZONE};
use tracing::trace;

impl Session<'_> {
    /// Remove every edge below `root` that appropriateness alone would
    /// restore.
    pub fn unfill(&mut self, root: NodeId) {
        self.unfill_with(root, false);
    }

    /// [`Session::unfill`] without checking the type of the carrying node.
    pub fn unfill_sloppy(&mut self, root: NodeId) {
        self.unfill_with(root, true);
    }

    fn unfill_with(&mut self, root: NodeId, sloppy: bool) {
        let shared = self.shared_nodes(root);
        let mut visited = FxHashSet::default();
        self.unfill_rec(root, sloppy, &shared, &mut visited);
        self.arena.invalidate();
        trace!(target: "tfs::episode", %root, sloppy, "unfill");
    }

    fn unfill_rec(
        &mut self,
        node: NodeId,
        sloppy: bool,
        shared: &FxHashSet<NodeId>,
        visited: &mut FxHashSet<NodeId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        let edges: SmallVec<[Edge; 8]> = self.arena.edges(node).iter().copied().collect();
        let mut kept = SmallVec::with_capacity(edges.len());
        for edge in edges {
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.unfill_rec(edge.target, sloppy, shared, visited)
            });
            if !self.is_unfillable(node, edge, sloppy, shared) {
                kept.push(edge);
            }
        }
        self.arena.set_edges(node, kept);
    }

    fn is_unfillable(&self, node: NodeId, edge: Edge, sloppy: bool, shared: &FxHashSet<NodeId>) -> bool {
        let Some(appropriate) = self.grammar.appropriateness(edge.feature) else {
            return false;
        };
        self.arena.edges(edge.target).is_empty()
            && !shared.contains(&edge.target)
            && (sloppy || self.arena.node_type(node) == appropriate.introduced_by)
            && self.arena.node_type(edge.target) == appropriate.max_type
    }

    /// Nodes below `root` with more than one incoming edge, including nodes
    /// on a cycle back to `root`.
    fn shared_nodes(&self, root: NodeId) -> FxHashSet<NodeId> {
        let mut seen = FxHashSet::default();
        let mut shared = FxHashSet::default();
        seen.insert(root);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for edge in self.arena.edges(node) {
                if seen.insert(edge.target) {
                    stack.push(edge.target);
                } else {
                    shared.insert(edge.target);
                }
            }
        }
        shared
    }

    /// Restrict the dag below `root` in place, with the treatment parsers
    /// give passive edges:
    ///
    /// - a difference list whose `LIST` and `LAST` meet is emptied,
    /// - the difference list [`MAX_SLASH_DEPTH`] `SLASH` values down is
    ///   emptied and not descended into,
    /// - below a restrictor node that does not keep everything, edges the
    ///   restrictor leaves alone are unfilled.
    pub(crate) fn restrict_special_dag(&mut self, root: NodeId, restrictor: &Restrictor) {
        let shared = self.shared_nodes(root);
        let mut seen = FxHashSet::default();
        self.restrict_special_rec(root, restrictor, restrictor.start(), 0, &shared, &mut seen);
        self.arena.invalidate();
    }

    fn restrict_special_rec(
        &mut self,
        node: NodeId,
        restrictor: &Restrictor,
        cursor: RestrictCursor,
        slash_depth: u32,
        shared: &FxHashSet<NodeId>,
        seen: &mut FxHashSet<(NodeId, RestrictCursor)>,
    ) {
        if !seen.insert((node, cursor)) {
            return;
        }
        self.empty_closed_diff_list(node);
        let ty = restrictor.generalize(cursor, self.arena.node_type(node), self.grammar.lattice());
        self.arena.set_node_type(node, ty);

        // A rstr_no node without children, like an open walk, only applies
        // the global delete set.
        let rules = restrictor
            .node_at(cursor)
            .filter(|rules| rules.mode != RestrictMode::None || !rules.children().is_empty());
        let slash = self.grammar.special_features().slash;
        let edges: SmallVec<[Edge; 8]> = self.arena.edges(node).iter().copied().collect();
        let mut kept = SmallVec::with_capacity(edges.len());
        for edge in edges {
            if !restrictor.keeps(cursor, edge.feature) {
                continue;
            }
            let child = rules.and_then(|rules| rules.child(edge.feature));
            match (rules, child) {
                (None, _) => {
                    let sub = restrictor.descend(cursor, edge.feature);
                    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.restrict_special_rec(edge.target, restrictor, sub, slash_depth, shared, seen)
                    });
                    kept.push(edge);
                }
                (Some(_), None) => {
                    if !self.is_unfillable(node, edge, false, shared) {
                        kept.push(edge);
                    }
                }
                (Some(_), Some(child)) => {
                    let depth = slash_depth + u32::from(Some(edge.feature) == slash);
                    if depth == MAX_SLASH_DEPTH && Some(edge.feature) == slash {
                        self.truncate_diff_list(edge.target);
                        kept.push(edge);
                        continue;
                    }
                    let sub = RestrictCursor::At(child);
                    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.restrict_special_rec(edge.target, restrictor, sub, depth, shared, seen)
                    });
                    if !self.is_unfillable(node, edge, false, shared) {
                        kept.push(edge);
                    }
                }
            }
        }
        self.arena.set_edges(node, kept);
    }

    /// `[*diff-list* LIST #1 [...] LAST #1]` is an empty list; drop what
    /// hangs below `#1`.
    fn empty_closed_diff_list(&mut self, node: NodeId) {
        let special = self.grammar.special_features();
        let (Some(diff_list), Some(list), Some(last)) =
            (self.grammar.diff_list_type(), special.list, special.last)
        else {
            return;
        };
        if !self.grammar.lattice().subsumes(diff_list, self.arena.node_type(node)) {
            return;
        }
        if let (Some(front), Some(tail)) = (self.arena.value(node, list), self.arena.value(node, last)) {
            if front == tail && !self.arena.edges(front).is_empty() {
                self.arena.set_edges(front, SmallVec::new());
            }
        }
    }

    /// Turn the difference list at `node` into an empty one: `LIST` loses
    /// its structure and `LAST` points at it.
    fn truncate_diff_list(&mut self, node: NodeId) {
        let special = self.grammar.special_features();
        let (Some(list), Some(last)) = (special.list, special.last) else {
            return;
        };
        if let Some(front) = self.arena.value(node, list) {
            self.arena.set_edges(front, SmallVec::new());
            self.arena.add_edge(node, last, front);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unfill_tests.rs"]
mod tests;
