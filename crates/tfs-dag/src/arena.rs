//! Node arena with generation-stamped scratch slots.
//!
//! Every node carries its committed content (type and sorted edges) plus a
//! set of scratch slots used by one unification, subsumption or copy
//! episode:
//!
//! - `forward`: union-find style redirection to the representative node
//! - `copy`: copy memo, in-progress marker, or subsumption partner
//! - `new_type`: type after promotion
//! - `pending`: edges gained during a merge, not yet committed
//! - `visit`: counter for the coreference analyses
//!
//! Scratch slots are only meaningful while the node's stamp equals the
//! arena's current generation. [`DagArena::invalidate`] bumps the generation,
//! which resets every slot of every node at once.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use tfs_common::{FeatureId, TypeId};

/// Stable handle of a node inside one [`DagArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A labelled arc to a (possibly shared) target node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub feature: FeatureId,
    pub target: NodeId,
}

impl Edge {
    #[inline]
    pub const fn new(feature: FeatureId, target: NodeId) -> Self {
        Edge { feature, target }
    }
}

/// Content of the copy slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CopySlot {
    Empty,
    /// The node is being copied; reaching it again means a cycle.
    InProgress,
    Node(NodeId),
}

#[derive(Clone, Debug)]
struct Scratch {
    generation: u32,
    new_type: TypeId,
    forward: Option<NodeId>,
    copy: CopySlot,
    visit: i32,
    pending: Vec<Edge>,
}

impl Scratch {
    const fn stale() -> Self {
        Scratch {
            generation: 0,
            new_type: TypeId::TOP,
            forward: None,
            copy: CopySlot::Empty,
            visit: -1,
            pending: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    ty: TypeId,
    edges: SmallVec<[Edge; 4]>,
    scratch: Scratch,
}

/// Owner of all nodes of one session.
///
/// Nodes are never freed individually; episodes that fail roll back the
/// nodes they allocated, and [`DagArena::clear`] drops everything.
#[derive(Clone, Debug)]
pub struct DagArena {
    nodes: Vec<Node>,
    generation: u32,
}

impl DagArena {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DagArena {
            nodes: Vec::with_capacity(capacity),
            generation: 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all nodes. Every previously issued `NodeId` becomes invalid.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.generation = 1;
    }

    // -------------------------------------------------------------------------
    // Committed structure
    // -------------------------------------------------------------------------

    pub fn add_node(&mut self, ty: TypeId) -> NodeId {
        self.add_node_with_edges(ty, SmallVec::new())
    }

    /// Allocate a node whose `edges` are already sorted by feature.
    pub(crate) fn add_node_with_edges(&mut self, ty: TypeId, edges: SmallVec<[Edge; 4]>) -> NodeId {
        debug_assert!(edges.windows(2).all(|w| w[0].feature < w[1].feature));
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node {
            ty,
            edges,
            scratch: Scratch::stale(),
        });
        id
    }

    /// Set `node.feature = target`, keeping the edges sorted.
    ///
    /// Returns the previous target if the feature was already present.
    pub fn add_edge(&mut self, node: NodeId, feature: FeatureId, target: NodeId) -> Option<NodeId> {
        let edges = &mut self.nodes[node.index()].edges;
        match edges.binary_search_by_key(&feature, |e| e.feature) {
            Ok(pos) => Some(std::mem::replace(&mut edges[pos].target, target)),
            Err(pos) => {
                edges.insert(pos, Edge::new(feature, target));
                None
            }
        }
    }

    pub fn remove_edge(&mut self, node: NodeId, feature: FeatureId) -> Option<NodeId> {
        let edges = &mut self.nodes[node.index()].edges;
        let pos = edges.binary_search_by_key(&feature, |e| e.feature).ok()?;
        Some(edges.remove(pos).target)
    }

    pub(crate) fn set_edges(&mut self, node: NodeId, edges: SmallVec<[Edge; 4]>) {
        debug_assert!(edges.windows(2).all(|w| w[0].feature < w[1].feature));
        self.nodes[node.index()].edges = edges;
    }

    #[inline]
    pub fn node_type(&self, node: NodeId) -> TypeId {
        self.nodes[node.index()].ty
    }

    #[inline]
    pub fn set_node_type(&mut self, node: NodeId, ty: TypeId) {
        self.nodes[node.index()].ty = ty;
    }

    /// Committed edges, sorted by feature.
    #[inline]
    pub fn edges(&self, node: NodeId) -> &[Edge] {
        &self.nodes[node.index()].edges
    }

    /// Committed value of `feature`.
    pub fn value(&self, node: NodeId, feature: FeatureId) -> Option<NodeId> {
        let edges = self.edges(node);
        edges
            .binary_search_by_key(&feature, |e| e.feature)
            .ok()
            .map(|pos| edges[pos].target)
    }

    /// Follow committed edges along `path`.
    pub fn sub_node(&self, node: NodeId, path: &[FeatureId]) -> Option<NodeId> {
        path.iter()
            .try_fold(node, |current, &feature| self.value(current, feature))
    }

    /// Copy the committed structure below `root` of another arena into this
    /// one. Coreferences and cycles are preserved.
    pub fn import(&mut self, source: &DagArena, root: NodeId) -> NodeId {
        let mut memo = FxHashMap::default();
        self.import_rec(source, root, &mut memo)
    }

    fn import_rec(
        &mut self,
        source: &DagArena,
        node: NodeId,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(&copy) = memo.get(&node) {
            return copy;
        }
        let copy = self.add_node(source.node_type(node));
        memo.insert(node, copy);
        for edge in source.edges(node) {
            let target = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.import_rec(source, edge.target, memo)
            });
            self.nodes[copy.index()].edges.push(Edge::new(edge.feature, target));
        }
        copy
    }

    /// Structural copy of the committed dag below `root` inside this arena.
    pub fn clone_dag(&mut self, root: NodeId) -> NodeId {
        let mut memo = FxHashMap::default();
        self.clone_rec(root, &mut memo)
    }

    fn clone_rec(&mut self, node: NodeId, memo: &mut FxHashMap<NodeId, NodeId>) -> NodeId {
        if let Some(&copy) = memo.get(&node) {
            return copy;
        }
        let copy = self.add_node(self.node_type(node));
        memo.insert(node, copy);
        let edges = self.nodes[node.index()].edges.clone();
        let mut copied = SmallVec::with_capacity(edges.len());
        for edge in edges {
            let target = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.clone_rec(edge.target, memo)
            });
            copied.push(Edge::new(edge.feature, target));
        }
        self.nodes[copy.index()].edges = copied;
        copy
    }

    // -------------------------------------------------------------------------
    // Generations
    // -------------------------------------------------------------------------

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Start a new generation: all scratch slots become unset in O(1).
    pub fn invalidate(&mut self) {
        if self.generation == u32::MAX {
            // Stamps would collide after wrapping; pay one sweep instead.
            for node in &mut self.nodes {
                node.scratch.generation = 0;
            }
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Mark to pass to [`DagArena::truncate`].
    #[inline]
    pub fn checkpoint(&self) -> usize {
        self.nodes.len()
    }

    /// Drop nodes allocated after `checkpoint`. Nothing committed may point
    /// at them.
    pub fn truncate(&mut self, checkpoint: usize) {
        self.nodes.truncate(checkpoint);
    }

    /// Drop the nodes between `checkpoint` and `start`, moving the nodes
    /// allocated since `start` down in their place. Nothing may point into
    /// the dropped range. Returns the new id of `node`.
    pub fn compact(&mut self, checkpoint: usize, start: usize, node: NodeId) -> NodeId {
        debug_assert!(checkpoint <= start && start <= self.nodes.len());
        let shift = start - checkpoint;
        if shift == 0 {
            return node;
        }
        self.nodes.drain(checkpoint..start);
        let moved = |id: NodeId| {
            debug_assert!(id.index() < checkpoint || id.index() >= start);
            if id.index() >= start {
                NodeId::from_index(id.index() - shift)
            } else {
                id
            }
        };
        for entry in &mut self.nodes[checkpoint..] {
            for edge in &mut entry.edges {
                edge.target = moved(edge.target);
            }
        }
        moved(node)
    }

    // -------------------------------------------------------------------------
    // Scratch slots
    // -------------------------------------------------------------------------

    #[inline]
    fn scratch(&self, node: NodeId) -> Option<&Scratch> {
        let scratch = &self.nodes[node.index()].scratch;
        (scratch.generation == self.generation).then_some(scratch)
    }

    /// Scratch of `node`, reset first if it belongs to an older generation.
    #[inline]
    fn touch(&mut self, node: NodeId) -> &mut Scratch {
        let generation = self.generation;
        let entry = &mut self.nodes[node.index()];
        if entry.scratch.generation != generation {
            let scratch = &mut entry.scratch;
            scratch.generation = generation;
            scratch.new_type = entry.ty;
            scratch.forward = None;
            scratch.copy = CopySlot::Empty;
            scratch.visit = -1;
            scratch.pending.clear();
        }
        &mut entry.scratch
    }

    /// Representative of `node`: follow forward pointers of this generation.
    #[inline]
    pub fn deref(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(next) = self.scratch(current).and_then(|s| s.forward) {
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    #[inline]
    pub(crate) fn forward(&self, node: NodeId) -> Option<NodeId> {
        self.scratch(node).and_then(|s| s.forward)
    }

    /// Subsumption and equality walks store node pairings here and never
    /// dereference, so `target == node` is allowed for them.
    #[inline]
    pub(crate) fn set_forward(&mut self, node: NodeId, target: NodeId) {
        self.touch(node).forward = Some(target);
    }

    /// Type of `node` in the current episode (promoted type if any).
    #[inline]
    pub fn current_type(&self, node: NodeId) -> TypeId {
        match self.scratch(node) {
            Some(scratch) => scratch.new_type,
            None => self.nodes[node.index()].ty,
        }
    }

    #[inline]
    pub(crate) fn set_current_type(&mut self, node: NodeId, ty: TypeId) {
        self.touch(node).new_type = ty;
    }

    #[inline]
    pub(crate) fn copy_slot(&self, node: NodeId) -> CopySlot {
        self.scratch(node).map_or(CopySlot::Empty, |s| s.copy)
    }

    #[inline]
    pub(crate) fn set_copy_slot(&mut self, node: NodeId, slot: CopySlot) {
        self.touch(node).copy = slot;
    }

    #[inline]
    pub(crate) fn visit(&self, node: NodeId) -> i32 {
        self.scratch(node).map_or(-1, |s| s.visit)
    }

    #[inline]
    pub(crate) fn set_visit(&mut self, node: NodeId, visit: i32) {
        self.touch(node).visit = visit;
    }

    /// Committed plus pending edges, merged in feature order.
    pub fn current_edges(&self, node: NodeId) -> CurrentEdges<'_> {
        let pending = self.scratch(node).map_or(&[][..], |s| s.pending.as_slice());
        CurrentEdges {
            committed: &self.nodes[node.index()].edges,
            pending,
        }
    }

    #[inline]
    pub(crate) fn has_current_edges(&self, node: NodeId) -> bool {
        !self.nodes[node.index()].edges.is_empty()
            || self.scratch(node).is_some_and(|s| !s.pending.is_empty())
    }

    /// Target of `feature` among committed and pending edges.
    pub(crate) fn find_current_edge(&self, node: NodeId, feature: FeatureId) -> Option<NodeId> {
        if let Some(target) = self.value(node, feature) {
            return Some(target);
        }
        let pending = &self.scratch(node)?.pending;
        pending
            .binary_search_by_key(&feature, |e| e.feature)
            .ok()
            .map(|pos| pending[pos].target)
    }

    /// Current value of `feature` on the representative of `node`,
    /// dereferenced.
    pub fn current_value(&self, node: NodeId, feature: FeatureId) -> Option<NodeId> {
        self.find_current_edge(self.deref(node), feature)
            .map(|target| self.deref(target))
    }

    /// Queue an edge on `node` for this episode, keeping pending edges sorted.
    pub(crate) fn push_pending(&mut self, node: NodeId, edge: Edge) {
        let pending = &mut self.touch(node).pending;
        match pending.binary_search_by_key(&edge.feature, |e| e.feature) {
            Ok(pos) => pending[pos] = edge,
            Err(pos) => pending.insert(pos, edge),
        }
    }
}

impl Default for DagArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over committed and pending edges of a node, in feature order.
pub struct CurrentEdges<'a> {
    committed: &'a [Edge],
    pending: &'a [Edge],
}

impl Iterator for CurrentEdges<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        let take_committed = match (self.committed.first(), self.pending.first()) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(c), Some(p)) => c.feature <= p.feature,
        };
        let (edge, rest) = if take_committed {
            self.committed.split_first()?
        } else {
            self.pending.split_first()?
        };
        if take_committed {
            self.committed = rest;
        } else {
            self.pending = rest;
        }
        Some(*edge)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.committed.len() + self.pending.len();
        (len, Some(len))
    }
}

#[cfg(test)]
#[path = "../tests/arena_tests.rs"]
mod tests;
