//! Copying an entangled unification result into fresh, committed nodes.

use crate::arena::{CopySlot, Edge, NodeId};
use crate::failure::FailureKind;
use crate::restrictor::{RestrictCursor, Restrictor};
use crate::session::Session;
use smallvec::SmallVec;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    #[error("result contains a cycle through {0}")]
    Cycle(NodeId),
}

impl Session<'_> {
    /// Copy the structure reachable from `root` in the current episode
    /// (forward pointers, promoted types and pending edges included), then
    /// end the episode.
    ///
    /// Nodes reached twice are copied once, so coreferences survive. A node
    /// reached again while its own copy is still being built is a cycle; the
    /// partial copy is discarded.
    pub fn copy_result(
        &mut self,
        root: NodeId,
        restrictor: Option<&Restrictor>,
    ) -> Result<NodeId, CopyError> {
        let checkpoint = self.arena.checkpoint();
        let cursor = restrictor.map_or(RestrictCursor::Open, Restrictor::start);
        let result = self.copy_rec(root, restrictor, cursor);
        if let Err(CopyError::Cycle(node)) = result {
            self.record(node, node, FailureKind::Cycle);
            self.arena.truncate(checkpoint);
        }
        self.arena.invalidate();
        result
    }

    fn copy_rec(
        &mut self,
        node: NodeId,
        restrictor: Option<&Restrictor>,
        cursor: RestrictCursor,
    ) -> Result<NodeId, CopyError> {
        let node = self.arena.deref(node);
        match self.arena.copy_slot(node) {
            CopySlot::InProgress => return Err(CopyError::Cycle(node)),
            CopySlot::Node(copy) => return Ok(copy),
            CopySlot::Empty => {}
        }

        let mut ty = self.arena.current_type(node);
        if let Some(restrictor) = restrictor {
            ty = restrictor.generalize(cursor, ty, self.grammar.lattice());
        }
        let edges: SmallVec<[Edge; 8]> = self.arena.current_edges(node).collect();
        self.arena.set_copy_slot(node, CopySlot::InProgress);

        let mut copied = SmallVec::with_capacity(edges.len());
        for edge in edges {
            let sub = match restrictor {
                Some(r) if !r.keeps(cursor, edge.feature) => continue,
                Some(r) => r.descend(cursor, edge.feature),
                None => RestrictCursor::Open,
            };
            let target = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.copy_rec(edge.target, restrictor, sub)
            })?;
            copied.push(Edge::new(edge.feature, target));
        }

        let copy = self.arena.add_node_with_edges(ty, copied);
        self.arena.set_copy_slot(node, CopySlot::Node(copy));
        Ok(copy)
    }

    /// Independent copy of the committed structure below `root`.
    pub fn clone_dag(&mut self, root: NodeId) -> NodeId {
        self.arena.clone_dag(root)
    }
}

#[cfg(test)]
#[path = "../tests/copy_tests.rs"]
mod tests;
