//! Construction of a [`TypeLattice`] from declared types and parents.
//!
//! The builder:
//! 1. resolves parent names and orders the hierarchy topologically
//! 2. classifies leaf types (single parent, only leaf descendants)
//! 3. computes descendant codes for proper types and inserts glb types until
//!    every non-empty intersection of two codes is the code of a type
//! 4. renumbers: TOP = 0, proper types in topological order, then leaves

use crate::bitcode::Bitcode;
use crate::glb_cache::GlbCache;
use crate::lattice::{TOP_TYPE_NAME, TypeLattice};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::RwLock;
use tfs_common::limits::MAX_GLB_CLOSURE_ROUNDS;
use tfs_common::{SymbolTable, TypeId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LatticeError {
    #[error("type name must not be empty")]
    EmptyName,
    #[error("type `{0}` is declared twice")]
    DuplicateType(String),
    #[error("type `{ty}` names unknown parent `{parent}`")]
    UnknownParent { ty: String, parent: String },
    #[error("type hierarchy contains a cycle through `{0}`")]
    CyclicHierarchy(String),
    #[error("glb closure did not converge after {0} rounds")]
    GlbClosureDiverged(usize),
}

/// Collects type declarations; `*top*` is predeclared.
#[derive(Debug, Clone)]
pub struct LatticeBuilder {
    decls: IndexMap<String, SmallVec<[String; 2]>, FxBuildHasher>,
}

/// Mutable hierarchy used while closing the codes.
struct Hierarchy {
    names: Vec<String>,
    parents: Vec<SmallVec<[usize; 2]>>,
    children: Vec<SmallVec<[usize; 4]>>,
    leaf: Vec<bool>,
}

impl LatticeBuilder {
    pub fn new() -> Self {
        let mut decls = IndexMap::default();
        decls.insert(TOP_TYPE_NAME.to_owned(), SmallVec::new());
        LatticeBuilder { decls }
    }

    /// Declare `name` below `parents`; an empty parent list means `*top*`.
    pub fn declare<I, S>(&mut self, name: &str, parents: I) -> Result<&mut Self, LatticeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name.is_empty() {
            return Err(LatticeError::EmptyName);
        }
        if self.decls.contains_key(name) {
            return Err(LatticeError::DuplicateType(name.to_owned()));
        }
        let mut list: SmallVec<[String; 2]> =
            parents.into_iter().map(|p| p.as_ref().to_owned()).collect();
        if list.is_empty() {
            list.push(TOP_TYPE_NAME.to_owned());
        }
        self.decls.insert(name.to_owned(), list);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn build(self) -> Result<TypeLattice, LatticeError> {
        let mut hierarchy = self.resolve()?;
        let order = topological_order(&hierarchy).map_err(|index| {
            LatticeError::CyclicHierarchy(hierarchy.names[index].clone())
        })?;

        for &t in order.iter().rev() {
            let is_leaf = t != 0
                && hierarchy.parents[t].len() == 1
                && hierarchy.children[t].iter().all(|&c| hierarchy.leaf[c]);
            hierarchy.leaf[t] = is_leaf;
        }

        let (glb_types, rounds) = close_under_glb(&mut hierarchy, &order)?;

        // Glb types change the order; recompute it over the closed hierarchy.
        let order = topological_order(&hierarchy).map_err(|index| {
            LatticeError::CyclicHierarchy(hierarchy.names[index].clone())
        })?;
        let lattice = renumber(&hierarchy, &order);

        debug!(
            target: "tfs::lattice",
            types = lattice.type_count(),
            proper = lattice.first_leaf,
            leaves = lattice.type_count() - lattice.first_leaf,
            glb_types,
            rounds,
            "type lattice built"
        );
        Ok(lattice)
    }

    fn resolve(&self) -> Result<Hierarchy, LatticeError> {
        let count = self.decls.len();
        let mut parents = Vec::with_capacity(count);
        for (name, list) in &self.decls {
            let mut resolved: SmallVec<[usize; 2]> = SmallVec::new();
            for parent in list {
                let Some(index) = self.decls.get_index_of(parent.as_str()) else {
                    return Err(LatticeError::UnknownParent {
                        ty: name.clone(),
                        parent: parent.clone(),
                    });
                };
                if !resolved.contains(&index) {
                    resolved.push(index);
                }
            }
            parents.push(resolved);
        }
        let mut children = vec![SmallVec::new(); count];
        for (child, list) in parents.iter().enumerate() {
            for &parent in list {
                children[parent].push(child);
            }
        }
        Ok(Hierarchy {
            names: self.decls.keys().cloned().collect(),
            parents,
            children,
            leaf: vec![false; count],
        })
    }
}

impl Default for LatticeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Kahn's algorithm from TOP. On a cycle, returns an index on it.
fn topological_order(hierarchy: &Hierarchy) -> Result<Vec<usize>, usize> {
    let count = hierarchy.names.len();
    let mut pending: Vec<usize> = hierarchy.parents.iter().map(|p| p.len()).collect();
    let mut queue: VecDeque<usize> = (0..count).filter(|&t| pending[t] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(t) = queue.pop_front() {
        order.push(t);
        for &child in &hierarchy.children[t] {
            pending[child] -= 1;
            if pending[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    if order.len() < count {
        let stuck = (0..count).find(|&t| pending[t] > 0).unwrap_or(0);
        return Err(stuck);
    }
    Ok(order)
}

/// Insert glb types until the proper codes are closed under intersection.
///
/// Returns the number of inserted types and the number of rounds.
fn close_under_glb(
    hierarchy: &mut Hierarchy,
    order: &[usize],
) -> Result<(usize, usize), LatticeError> {
    // Bits are working-local; the final numbering recomputes codes.
    let mut type_of_bit: Vec<usize> = Vec::new();
    let mut bit_of: Vec<Option<usize>> = vec![None; hierarchy.names.len()];
    for &t in order {
        if !hierarchy.leaf[t] {
            bit_of[t] = Some(type_of_bit.len());
            type_of_bit.push(t);
        }
    }
    let mut codes = vec![Bitcode::with_len(type_of_bit.len()); type_of_bit.len()];
    for &t in order.iter().rev() {
        let Some(bit) = bit_of[t] else { continue };
        let mut code = Bitcode::with_len(type_of_bit.len());
        code.insert(bit);
        for &child in &hierarchy.children[t] {
            if let Some(child_bit) = bit_of[child] {
                code.union_with(&codes[child_bit]);
            }
        }
        codes[bit] = code;
    }
    let mut by_code: FxHashMap<Bitcode, usize> =
        codes.iter().enumerate().map(|(bit, code)| (code.clone(), bit)).collect();

    let mut inserted = 0;
    let mut rounds = 0;
    loop {
        rounds += 1;
        if rounds > MAX_GLB_CLOSURE_ROUNDS {
            return Err(LatticeError::GlbClosureDiverged(MAX_GLB_CLOSURE_ROUNDS));
        }
        let mut changed = false;
        let mut a = 0;
        while a < codes.len() {
            let mut b = a + 1;
            while b < codes.len() {
                if let Some(meet) = missing_glb(&codes, &by_code, a, b) {
                    inserted += 1;
                    insert_glb_type(hierarchy, &mut codes, &mut type_of_bit, meet, inserted);
                    // Upper bounds gained the new bit; their keys changed.
                    by_code.clear();
                    by_code.extend(codes.iter().enumerate().map(|(bit, code)| (code.clone(), bit)));
                    debug_assert_eq!(by_code.len(), codes.len());
                    changed = true;
                }
                b += 1;
            }
            a += 1;
        }
        if !changed {
            return Ok((inserted, rounds));
        }
    }
}

/// The intersection of two codes if it is non-empty and has no type yet.
fn missing_glb(
    codes: &[Bitcode],
    by_code: &FxHashMap<Bitcode, usize>,
    a: usize,
    b: usize,
) -> Option<Bitcode> {
    let (code_a, code_b) = (&codes[a], &codes[b]);
    if code_a.is_subset(code_b) || code_b.is_subset(code_a) {
        return None;
    }
    let meet = code_a.intersection(code_b);
    if meet.is_zero() || by_code.contains_key(&meet) {
        return None;
    }
    Some(meet)
}

/// Add a type whose proper descendants are exactly `meet`.
fn insert_glb_type(
    hierarchy: &mut Hierarchy,
    codes: &mut Vec<Bitcode>,
    type_of_bit: &mut Vec<usize>,
    meet: Bitcode,
    serial: usize,
) {
    let bit = codes.len();
    let upper: SmallVec<[usize; 4]> = (0..bit).filter(|&u| meet.is_subset(&codes[u])).collect();
    let minimal_upper: SmallVec<[usize; 4]> = upper
        .iter()
        .copied()
        .filter(|&u| !upper.iter().any(|&v| v != u && codes[v].is_subset(&codes[u])))
        .collect();
    let maximal_lower: SmallVec<[usize; 4]> = meet
        .ones()
        .filter(|&c| !meet.ones().any(|d| d != c && codes[c].is_subset(&codes[d])))
        .collect();

    for code in codes.iter_mut() {
        code.grow(bit + 1);
    }
    for &u in &upper {
        codes[u].insert(bit);
    }
    let mut own = meet;
    own.grow(bit + 1);
    own.insert(bit);
    codes.push(own);

    let mut name = format!("glbtype{serial}");
    while hierarchy.names.contains(&name) {
        name.push('_');
    }
    let glb = hierarchy.names.len();
    hierarchy.names.push(name);
    hierarchy.leaf.push(false);
    let parents: SmallVec<[usize; 2]> = minimal_upper.iter().map(|&u| type_of_bit[u]).collect();
    let children: SmallVec<[usize; 4]> = maximal_lower.iter().map(|&c| type_of_bit[c]).collect();
    for &parent in &parents {
        for &child in &children {
            hierarchy.children[parent].retain(|c| *c != child);
            hierarchy.parents[child].retain(|p| *p != parent);
        }
        hierarchy.children[parent].push(glb);
    }
    for &child in &children {
        hierarchy.parents[child].push(glb);
    }
    hierarchy.parents.push(parents);
    hierarchy.children.push(children);
    type_of_bit.push(glb);
}

/// Assign final ids and compute the final codes.
fn renumber(hierarchy: &Hierarchy, order: &[usize]) -> TypeLattice {
    let count = hierarchy.names.len();
    let proper_count = order.iter().filter(|&&t| !hierarchy.leaf[t]).count();
    let mut final_id = vec![0u32; count];
    let mut sequence = Vec::with_capacity(count);
    for &t in order.iter().filter(|&&t| !hierarchy.leaf[t]) {
        final_id[t] = sequence.len() as u32;
        sequence.push(t);
    }
    for &t in order.iter().filter(|&&t| hierarchy.leaf[t]) {
        final_id[t] = sequence.len() as u32;
        sequence.push(t);
    }

    let mut names = SymbolTable::with_capacity(count);
    let mut parents = Vec::with_capacity(count);
    let mut children = Vec::with_capacity(count);
    for &t in &sequence {
        names.intern(&hierarchy.names[t]);
        let mut ps: SmallVec<[TypeId; 2]> =
            hierarchy.parents[t].iter().map(|&p| TypeId(final_id[p])).collect();
        ps.sort_unstable();
        parents.push(ps);
        let mut cs: SmallVec<[TypeId; 4]> =
            hierarchy.children[t].iter().map(|&c| TypeId(final_id[c])).collect();
        cs.sort_unstable();
        children.push(cs);
    }

    let mut codes = vec![Bitcode::with_len(proper_count); proper_count];
    for id in (0..proper_count).rev() {
        let mut code = Bitcode::with_len(proper_count);
        code.insert(id);
        for child in &children[id] {
            if child.index() < proper_count {
                code.union_with(&codes[child.index()]);
            }
        }
        codes[id] = code;
    }
    let code_to_type: FxHashMap<Bitcode, TypeId> = codes
        .iter()
        .enumerate()
        .map(|(id, code)| (code.clone(), TypeId(id as u32)))
        .collect();
    debug_assert_eq!(code_to_type.len(), proper_count);

    let mut depth = vec![0u32; count];
    for id in 0..count {
        depth[id] = parents[id]
            .iter()
            .map(|p| depth[p.index()] + 1)
            .max()
            .unwrap_or(0);
    }

    TypeLattice {
        names,
        first_leaf: proper_count as u32,
        codes,
        code_to_type,
        parents,
        children,
        depth,
        atoms: RwLock::new(Default::default()),
        glb: GlbCache::new(),
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod tests;
