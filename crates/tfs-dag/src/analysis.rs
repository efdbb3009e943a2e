//! Walks that inspect a dag without changing it: cycle detection and
//! coreference counting.

use crate::arena::{CopySlot, Edge, NodeId};
use crate::session::Session;
use smallvec::SmallVec;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};

impl Session<'_> {
    /// Whether the structure below `root` (as seen in the current episode)
    /// contains a cycle.
    pub fn check_cycles(&mut self, root: NodeId) -> bool {
        let cyclic = self.check_cycles_rec(root);
        self.arena.invalidate();
        cyclic
    }

    fn check_cycles_rec(&mut self, node: NodeId) -> bool {
        let node = self.arena.deref(node);
        match self.arena.visit(node) {
            v if v < 0 => {
                self.arena.set_visit(node, 0);
                self.arena.set_copy_slot(node, CopySlot::InProgress);
                for edge in self.current_edges_of(node) {
                    let cyclic = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.check_cycles_rec(edge.target)
                    });
                    if cyclic {
                        return true;
                    }
                }
                self.arena.set_copy_slot(node, CopySlot::Empty);
                false
            }
            0 => {
                if self.arena.copy_slot(node) == CopySlot::InProgress {
                    return true;
                }
                self.arena.set_visit(node, 1);
                false
            }
            _ => false,
        }
    }

    /// Number of coreferenced nodes: nodes reachable along more than one
    /// path. Nodes below a coreferenced node are not counted again.
    pub fn count_corefs(&mut self, root: NodeId) -> u32 {
        let count = self.count_corefs_rec(root, 0);
        self.arena.invalidate();
        count
    }

    fn count_corefs_rec(&mut self, node: NodeId, mut count: u32) -> u32 {
        let node = self.arena.deref(node);
        let visit = self.arena.visit(node);
        if visit < 0 {
            self.arena.set_visit(node, 0);
            for edge in self.current_edges_of(node) {
                count = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                    self.count_corefs_rec(edge.target, count)
                });
            }
        } else if visit == 0 {
            count += 1;
            self.arena.set_visit(node, count as i32);
        }
        count
    }

    /// Like [`Session::count_corefs`], but nodes below a coreferenced node
    /// are counted as well, since every path into them runs through the
    /// shared node.
    pub fn count_corefs_rigid(&mut self, root: NodeId) -> u32 {
        let count = self.count_corefs_rigid_rec(root, 0);
        self.arena.invalidate();
        count
    }

    fn count_corefs_rigid_rec(&mut self, node: NodeId, mut count: u32) -> u32 {
        let node = self.arena.deref(node);
        let visit = self.arena.visit(node);
        if visit > 0 {
            return count;
        }
        if visit < 0 {
            self.arena.set_visit(node, 0);
        } else {
            count += 1;
            self.arena.set_visit(node, count as i32);
        }
        for edge in self.current_edges_of(node) {
            count = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.count_corefs_rigid_rec(edge.target, count)
            });
        }
        count
    }

    fn current_edges_of(&self, node: NodeId) -> SmallVec<[Edge; 8]> {
        self.arena.current_edges(node).collect()
    }
}

#[cfg(test)]
#[path = "../tests/analysis_tests.rs"]
mod tests;
