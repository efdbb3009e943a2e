//! Restrictors: per-path keep / delete / generalize instructions applied
//! while copying or destructively pruning a dag.

use crate::arena::{DagArena, NodeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use tfs_common::{FeatureId, TypeId};
use tfs_lattice::{TOP_TYPE_NAME, TypeLattice};

#[derive(Debug, thiserror::Error)]
pub enum RestrictorError {
    #[error("restrictor node {node} has no type name")]
    UnnamedType { node: NodeId },
    #[error("unknown generalization type `{name}` in restrictor")]
    UnknownType { name: String },
}

/// Features deleted everywhere, regardless of position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteSet(SmallVec<[FeatureId; 4]>);

impl DeleteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: FeatureId) -> bool {
        match self.0.binary_search(&feature) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, feature);
                true
            }
        }
    }

    #[inline]
    pub fn contains(&self, feature: FeatureId) -> bool {
        self.0.binary_search(&feature).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<FeatureId> for DeleteSet {
    fn from_iter<T: IntoIterator<Item = FeatureId>>(iter: T) -> Self {
        let mut set = DeleteSet::new();
        for feature in iter {
            set.insert(feature);
        }
        set
    }
}

/// What a restrictor node does with the features of the dag node it is
/// matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RestrictMode {
    /// Keep only the features that have a (non-deleting) child restrictor.
    #[default]
    Keep,
    /// Drop the features of the node.
    Delete,
    /// Keep every feature except those whose child restrictor deletes.
    None,
}

impl RestrictMode {
    /// Parse a mode name: `rstr_keep`, `rstr_del`, `rstr_no` and their short
    /// forms, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "rstr_keep" | "keep" => Some(RestrictMode::Keep),
            "rstr_del" | "del" | "delete" => Some(RestrictMode::Delete),
            "rstr_no" | "no" | "none" => Some(RestrictMode::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RestrictMode::Keep => "rstr_keep",
            RestrictMode::Delete => "rstr_del",
            RestrictMode::None => "rstr_no",
        }
    }
}

impl fmt::Display for RestrictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RestrictorId(u32);

impl RestrictorId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, Default)]
pub struct RestrictorNode {
    pub mode: RestrictMode,
    pub generalize_to: SmallVec<[TypeId; 2]>,
    /// Sorted by feature.
    children: SmallVec<[(FeatureId, RestrictorId); 4]>,
}

impl RestrictorNode {
    pub fn children(&self) -> &[(FeatureId, RestrictorId)] {
        &self.children
    }

    pub fn child(&self, feature: FeatureId) -> Option<RestrictorId> {
        self.children
            .binary_search_by_key(&feature, |&(f, _)| f)
            .ok()
            .map(|pos| self.children[pos].1)
    }
}

/// Tree-shaped restrictor. Nodes may be shared, so the shape can be cyclic.
#[derive(Clone, Debug)]
pub struct RestrictorTree {
    nodes: Vec<RestrictorNode>,
    root: RestrictorId,
    delete: DeleteSet,
}

impl RestrictorTree {
    pub fn new(root_mode: RestrictMode) -> Self {
        RestrictorTree {
            nodes: vec![RestrictorNode {
                mode: root_mode,
                ..RestrictorNode::default()
            }],
            root: RestrictorId(0),
            delete: DeleteSet::new(),
        }
    }

    /// Also delete `delete` everywhere.
    pub fn with_delete_set(mut self, delete: DeleteSet) -> Self {
        self.delete = delete;
        self
    }

    pub fn root(&self) -> RestrictorId {
        self.root
    }

    pub fn delete_set(&self) -> &DeleteSet {
        &self.delete
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: RestrictorId) -> &RestrictorNode {
        &self.nodes[id.index()]
    }

    pub fn add_node(&mut self, mode: RestrictMode) -> RestrictorId {
        let id = RestrictorId(self.nodes.len() as u32);
        self.nodes.push(RestrictorNode {
            mode,
            ..RestrictorNode::default()
        });
        id
    }

    /// Attach `child` under `parent` for `feature`, replacing any previous
    /// child for that feature.
    pub fn set_child(&mut self, parent: RestrictorId, feature: FeatureId, child: RestrictorId) {
        let children = &mut self.nodes[parent.index()].children;
        match children.binary_search_by_key(&feature, |&(f, _)| f) {
            Ok(pos) => children[pos].1 = child,
            Err(pos) => children.insert(pos, (feature, child)),
        }
    }

    /// Convenience: create a child node with `mode` and attach it.
    pub fn add_child(
        &mut self,
        parent: RestrictorId,
        feature: FeatureId,
        mode: RestrictMode,
    ) -> RestrictorId {
        let child = self.add_node(mode);
        self.set_child(parent, feature, child);
        child
    }

    pub fn set_generalization(&mut self, node: RestrictorId, types: impl IntoIterator<Item = TypeId>) {
        self.nodes[node.index()].generalize_to = types.into_iter().collect();
    }

    /// Build a restrictor from a pseudo-dag whose type names encode
    /// `mode[,type...]`.
    ///
    /// `*top*` stands for `rstr_keep` without generalization. When the first
    /// part is not a mode name, the mode is `rstr_keep` and all parts are
    /// generalization types. Coreferenced pseudo-dag nodes map to one shared
    /// restrictor node.
    pub fn from_pseudo_dag(
        arena: &DagArena,
        root: NodeId,
        lattice: &TypeLattice,
    ) -> Result<Self, RestrictorError> {
        let mut tree = RestrictorTree {
            nodes: Vec::new(),
            root: RestrictorId(0),
            delete: DeleteSet::new(),
        };
        let mut visited = FxHashMap::default();
        tree.root = tree.convert(arena, root, lattice, &mut visited)?;
        Ok(tree)
    }

    fn convert(
        &mut self,
        arena: &DagArena,
        node: NodeId,
        lattice: &TypeLattice,
        visited: &mut FxHashMap<NodeId, RestrictorId>,
    ) -> Result<RestrictorId, RestrictorError> {
        if let Some(&id) = visited.get(&node) {
            return Ok(id);
        }
        let (mode, generalize_to) = parse_node_type(arena.node_type(node), node, lattice)?;
        let id = self.add_node(mode);
        self.nodes[id.index()].generalize_to = generalize_to;
        visited.insert(node, id);
        for edge in arena.edges(node) {
            let child = stacker::maybe_grow(
                tfs_common::limits::STACK_RED_ZONE,
                tfs_common::limits::STACK_GROWTH,
                || self.convert(arena, edge.target, lattice, visited),
            )?;
            self.set_child(id, edge.feature, child);
        }
        Ok(id)
    }
}

fn parse_node_type(
    ty: TypeId,
    node: NodeId,
    lattice: &TypeLattice,
) -> Result<(RestrictMode, SmallVec<[TypeId; 2]>), RestrictorError> {
    if ty.is_top() {
        return Ok((RestrictMode::Keep, SmallVec::new()));
    }
    let name = lattice
        .type_name(ty)
        .ok_or(RestrictorError::UnnamedType { node })?;
    let name = name.trim_matches('"');
    let mut parts = name.split(',').map(str::trim).filter(|p| !p.is_empty()).peekable();
    let mode = match parts.peek().and_then(|first| RestrictMode::from_name(first)) {
        Some(mode) => {
            parts.next();
            mode
        }
        None => RestrictMode::Keep,
    };
    let types = parts
        .map(|part| {
            if part == TOP_TYPE_NAME {
                return Ok(TypeId::TOP);
            }
            lattice.type_id(part).ok_or_else(|| RestrictorError::UnknownType {
                name: part.to_string(),
            })
        })
        .collect::<Result<_, _>>()?;
    Ok((mode, types))
}

/// Either a plain delete set or a full restrictor tree.
#[derive(Clone, Debug)]
pub enum Restrictor {
    Simple(DeleteSet),
    Tree(RestrictorTree),
}

/// Position of a walk in the restrictor. `Open` means "below any restrictor
/// node": everything is kept except globally deleted features.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum RestrictCursor {
    Open,
    At(RestrictorId),
}

impl Restrictor {
    pub fn delete_set(&self) -> &DeleteSet {
        match self {
            Restrictor::Simple(delete) => delete,
            Restrictor::Tree(tree) => &tree.delete,
        }
    }

    pub(crate) fn start(&self) -> RestrictCursor {
        match self {
            Restrictor::Simple(_) => RestrictCursor::Open,
            Restrictor::Tree(tree) => RestrictCursor::At(tree.root),
        }
    }

    /// Restrictor node at `cursor`, `None` for an open walk.
    pub(crate) fn node_at(&self, cursor: RestrictCursor) -> Option<&RestrictorNode> {
        match (self, cursor) {
            (Restrictor::Tree(tree), RestrictCursor::At(id)) => Some(tree.node(id)),
            _ => None,
        }
    }

    /// Whether the edge for `feature` survives at `cursor`.
    pub(crate) fn keeps(&self, cursor: RestrictCursor, feature: FeatureId) -> bool {
        if self.delete_set().contains(feature) {
            return false;
        }
        let (tree, id) = match (self, cursor) {
            (Restrictor::Tree(tree), RestrictCursor::At(id)) => (tree, id),
            _ => return true,
        };
        let node = tree.node(id);
        let child_mode = node.child(feature).map(|c| tree.node(c).mode);
        match node.mode {
            RestrictMode::None => child_mode != Some(RestrictMode::Delete),
            RestrictMode::Keep => child_mode.is_some_and(|m| m != RestrictMode::Delete),
            RestrictMode::Delete => false,
        }
    }

    /// Cursor for the value of `feature`.
    pub(crate) fn descend(&self, cursor: RestrictCursor, feature: FeatureId) -> RestrictCursor {
        match (self, cursor) {
            (Restrictor::Tree(tree), RestrictCursor::At(id)) => tree
                .node(id)
                .child(feature)
                .map_or(RestrictCursor::Open, RestrictCursor::At),
            _ => RestrictCursor::Open,
        }
    }

    /// Most specific generalization type at `cursor` that subsumes `ty`;
    /// `ty` itself when none applies.
    pub(crate) fn generalize(
        &self,
        cursor: RestrictCursor,
        ty: TypeId,
        lattice: &TypeLattice,
    ) -> TypeId {
        let (tree, id) = match (self, cursor) {
            (Restrictor::Tree(tree), RestrictCursor::At(id)) => (tree, id),
            _ => return ty,
        };
        let mut best: Option<TypeId> = None;
        for &candidate in &tree.node(id).generalize_to {
            if !lattice.subsumes(candidate, ty) {
                continue;
            }
            best = match best {
                Some(current) if !lattice.subsumes(current, candidate) => Some(current),
                _ => Some(candidate),
            };
        }
        best.unwrap_or(ty)
    }
}

impl From<DeleteSet> for Restrictor {
    fn from(delete: DeleteSet) -> Self {
        Restrictor::Simple(delete)
    }
}

impl From<RestrictorTree> for Restrictor {
    fn from(tree: RestrictorTree) -> Self {
        Restrictor::Tree(tree)
    }
}

#[cfg(test)]
#[path = "../tests/restrictor_tests.rs"]
mod tests;
