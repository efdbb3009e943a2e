//! Quick check: types at a fixed set of paths, compared before running the
//! full unifier.

use crate::arena::{DagArena, NodeId};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use tfs_common::{FeatureId, TypeId};
use tfs_lattice::TypeLattice;

#[derive(Debug, thiserror::Error)]
pub enum QcError {
    #[error("quick-check node {node} is not named by a position: `{name}`")]
    BadPosition { node: NodeId, name: String },
    #[error("quick-check paths contain a cycle through {node}")]
    Cyclic { node: NodeId },
}

#[derive(Clone, Debug, Default)]
struct QcNode {
    position: Option<usize>,
    children: SmallVec<[(FeatureId, u32); 2]>,
}

/// Paths whose values make up a quick-check vector, stored as a trie.
#[derive(Clone, Debug)]
pub struct QcPaths {
    nodes: Vec<QcNode>,
    len: usize,
}

impl Default for QcPaths {
    fn default() -> Self {
        Self::empty()
    }
}

impl QcPaths {
    pub fn empty() -> Self {
        QcPaths {
            nodes: vec![QcNode::default()],
            len: 0,
        }
    }

    /// The `i`-th path fills position `i` of the vector.
    pub fn from_paths<P>(paths: impl IntoIterator<Item = P>) -> Self
    where
        P: AsRef<[FeatureId]>,
    {
        let mut qc = QcPaths::empty();
        for (position, path) in paths.into_iter().enumerate() {
            let mut current = 0u32;
            for &feature in path.as_ref() {
                current = qc.child_or_insert(current, feature);
            }
            qc.nodes[current as usize].position = Some(position);
            qc.len = position + 1;
        }
        qc
    }

    /// Read the trie from a pseudo-dag whose node types are 1-based
    /// positions written as quoted numbers; `*top*` nodes only route.
    pub fn from_pseudo_dag(
        arena: &DagArena,
        root: NodeId,
        lattice: &TypeLattice,
    ) -> Result<Self, QcError> {
        let mut qc = QcPaths::empty();
        let mut on_path = FxHashSet::default();
        qc.convert(arena, root, 0, lattice, &mut on_path)?;
        Ok(qc)
    }

    fn convert(
        &mut self,
        arena: &DagArena,
        node: NodeId,
        trie: u32,
        lattice: &TypeLattice,
        on_path: &mut FxHashSet<NodeId>,
    ) -> Result<(), QcError> {
        if !on_path.insert(node) {
            return Err(QcError::Cyclic { node });
        }
        let ty = arena.node_type(node);
        if !ty.is_top() {
            let name = lattice.type_name(ty).unwrap_or_default();
            let position = name
                .trim_matches('"')
                .parse::<usize>()
                .ok()
                .filter(|&p| p > 0)
                .ok_or_else(|| QcError::BadPosition {
                    node,
                    name: name.to_string(),
                })?;
            self.nodes[trie as usize].position = Some(position - 1);
            self.len = self.len.max(position);
        }
        for edge in arena.edges(node) {
            let child = self.child_or_insert(trie, edge.feature);
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.convert(arena, edge.target, child, lattice, on_path)
            })?;
        }
        on_path.remove(&node);
        Ok(())
    }

    fn child_or_insert(&mut self, parent: u32, feature: FeatureId) -> u32 {
        let children = &self.nodes[parent as usize].children;
        match children.binary_search_by_key(&feature, |&(f, _)| f) {
            Ok(pos) => children[pos].1,
            Err(pos) => {
                let id = self.nodes.len() as u32;
                self.nodes.push(QcNode::default());
                self.nodes[parent as usize].children.insert(pos, (feature, id));
                id
            }
        }
    }

    /// Number of positions in a vector.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nodes reached by each path below `root`, following the current
    /// (possibly entangled) structure.
    pub fn nodes(&self, arena: &DagArena, root: NodeId) -> SmallVec<[Option<NodeId>; 8]> {
        let mut out = SmallVec::from_elem(None, self.len);
        if self.len > 0 {
            self.collect(arena, arena.deref(root), 0, &mut out);
        }
        out
    }

    fn collect(&self, arena: &DagArena, node: NodeId, trie: u32, out: &mut [Option<NodeId>]) {
        let entry = &self.nodes[trie as usize];
        if let Some(position) = entry.position {
            out[position] = Some(node);
        }
        for &(feature, child) in &entry.children {
            if let Some(target) = arena.current_value(node, feature) {
                self.collect(arena, target, child, out);
            }
        }
    }

    /// Types at the quick-check paths below `root`.
    pub fn vector(&self, arena: &DagArena, root: NodeId) -> QcVector {
        let types = self
            .nodes(arena, root)
            .into_iter()
            .map(|node| node.map_or(TypeId::BOTTOM, |n| arena.current_type(n)))
            .collect();
        QcVector { types }
    }
}

/// Types found at the quick-check paths; BOTTOM marks an absent path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QcVector {
    types: SmallVec<[TypeId; 8]>,
}

impl QcVector {
    pub fn from_types(types: impl IntoIterator<Item = TypeId>) -> Self {
        QcVector {
            types: types.into_iter().collect(),
        }
    }

    pub fn types(&self) -> &[TypeId] {
        &self.types
    }

    /// Type at `position`, BOTTOM when absent.
    pub fn get(&self, position: usize) -> TypeId {
        self.types.get(position).copied().unwrap_or(TypeId::BOTTOM)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// False if some position present in both vectors holds types without a
    /// common subtype.
    pub fn compatible(&self, other: &QcVector, lattice: &TypeLattice) -> bool {
        self.types
            .iter()
            .zip(other.types.iter())
            .all(|(&a, &b)| a.is_bottom() || b.is_bottom() || !lattice.unify(a, b).is_bottom())
    }
}

#[cfg(test)]
#[path = "../tests/quick_check_tests.rs"]
mod tests;
