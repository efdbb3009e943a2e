//! The immutable type lattice and its GLB / subsumption queries.

use crate::bitcode::Bitcode;
use crate::glb_cache::{GlbCache, GlbCacheError, GlbTable, read_glb_cache, write_glb_table};
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::sync::{PoisonError, RwLock};
use tfs_common::{SymbolTable, TypeId};
use tracing::{debug, error};

/// Name of the universal supertype.
pub const TOP_TYPE_NAME: &str = "*top*";

/// A multiple-inheritance type hierarchy with bit-coded proper types.
///
/// Built once by [`crate::LatticeBuilder`] and shared read-only afterwards.
/// Only the GLB cache and the runtime atom table change after construction,
/// and both are safe to use from several threads.
pub struct TypeLattice {
    pub(crate) names: SymbolTable<TypeId>,
    pub(crate) first_leaf: u32,
    /// Codes of proper types, indexed by type id.
    pub(crate) codes: Vec<Bitcode>,
    pub(crate) code_to_type: FxHashMap<Bitcode, TypeId>,
    pub(crate) parents: Vec<SmallVec<[TypeId; 2]>>,
    pub(crate) children: Vec<SmallVec<[TypeId; 4]>>,
    pub(crate) depth: Vec<u32>,
    pub(crate) atoms: RwLock<IndexSet<String, FxBuildHasher>>,
    pub(crate) glb: GlbCache,
}

impl TypeLattice {
    // -------------------------------------------------------------------------
    // Ranges
    // -------------------------------------------------------------------------

    /// Number of grammar types (proper + leaf).
    #[inline]
    pub fn type_count(&self) -> u32 {
        self.names.len() as u32
    }

    /// Id of the first leaf type; all smaller ids are proper.
    #[inline]
    pub fn first_leaf_type(&self) -> TypeId {
        TypeId(self.first_leaf)
    }

    #[inline]
    pub fn is_grammar_type(&self, t: TypeId) -> bool {
        t.0 < self.type_count()
    }

    #[inline]
    pub fn is_proper_type(&self, t: TypeId) -> bool {
        t.0 < self.first_leaf
    }

    #[inline]
    pub fn is_leaf_type(&self, t: TypeId) -> bool {
        t.0 >= self.first_leaf && t.0 < self.type_count()
    }

    /// Runtime atoms: neither BOTTOM nor a grammar type.
    #[inline]
    pub fn is_atom(&self, t: TypeId) -> bool {
        !t.is_bottom() && !self.is_grammar_type(t)
    }

    /// The single parent of a leaf type.
    #[inline]
    pub fn leaf_parent(&self, t: TypeId) -> Option<TypeId> {
        if self.is_leaf_type(t) {
            self.parents[t.index()].first().copied()
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------------

    /// Id of a grammar type or an already interned atom.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        if let Some(t) = self.names.get(name) {
            return Some(t);
        }
        let atoms = self.atoms.read().unwrap_or_else(PoisonError::into_inner);
        atoms
            .get_index_of(name)
            .map(|index| TypeId(self.type_count() + index as u32))
    }

    pub fn type_name(&self, t: TypeId) -> Option<Cow<'_, str>> {
        if let Some(name) = self.names.name(t) {
            return Some(Cow::Borrowed(name));
        }
        if t.is_bottom() {
            return None;
        }
        let atoms = self.atoms.read().unwrap_or_else(PoisonError::into_inner);
        atoms
            .get_index((t.0 - self.type_count()) as usize)
            .map(|name| Cow::Owned(name.clone()))
    }

    /// Id for `name`, registering a runtime atom when it is not a grammar type.
    pub fn intern_atom(&self, name: &str) -> TypeId {
        if let Some(t) = self.names.get(name) {
            return t;
        }
        let mut atoms = self.atoms.write().unwrap_or_else(PoisonError::into_inner);
        let (index, _) = atoms.insert_full(name.to_owned());
        TypeId(self.type_count() + index as u32)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Immediate supertypes; empty for TOP and atoms.
    pub fn parents(&self, t: TypeId) -> &[TypeId] {
        self.parents.get(t.index()).map_or(&[][..], |p| p.as_slice())
    }

    /// Immediate subtypes; empty for leaves without children and atoms.
    pub fn children(&self, t: TypeId) -> &[TypeId] {
        self.children.get(t.index()).map_or(&[][..], |c| c.as_slice())
    }

    /// Length of the longest path from TOP; atoms sit directly below TOP.
    pub fn top_distance(&self, t: TypeId) -> u32 {
        match self.depth.get(t.index()) {
            Some(&depth) => depth,
            None => 1,
        }
    }

    pub fn bitcode(&self, t: TypeId) -> Option<&Bitcode> {
        if self.is_proper_type(t) {
            self.codes.get(t.index())
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // GLB and subsumption
    // -------------------------------------------------------------------------

    /// Greatest lower bound of two types, or `TypeId::BOTTOM` if they clash.
    pub fn unify(&self, t1: TypeId, t2: TypeId) -> TypeId {
        if t1.is_bottom() || t2.is_bottom() {
            return TypeId::BOTTOM;
        }
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        if lo.is_top() || lo == hi {
            return hi;
        }
        if !self.is_grammar_type(hi) {
            return TypeId::BOTTOM;
        }
        if let Some(glb) = self.glb.get(lo, hi) {
            return glb;
        }
        let glb = self.compute_glb(lo, hi);
        self.glb.insert(lo, hi, glb);
        glb
    }

    /// `general` subsumes `specific`, i.e. their GLB is `specific`.
    #[inline]
    pub fn subsumes(&self, general: TypeId, specific: TypeId) -> bool {
        general == specific || general.is_top() || self.unify(general, specific) == specific
    }

    fn compute_glb(&self, lo: TypeId, hi: TypeId) -> TypeId {
        match (self.is_leaf_type(lo), self.is_leaf_type(hi)) {
            (false, false) => {
                let code = self.codes[lo.index()].intersection(&self.codes[hi.index()]);
                if code.is_zero() {
                    return TypeId::BOTTOM;
                }
                match self.code_to_type.get(&code) {
                    Some(&glb) => glb,
                    None => {
                        error!(target: "tfs::lattice", %lo, %hi, "no type for intersected bitcode");
                        debug_assert!(false, "lattice is not closed under glb");
                        TypeId::BOTTOM
                    }
                }
            }
            (true, true) => {
                if self.leaf_chain_reaches(lo, hi) {
                    lo
                } else if self.leaf_chain_reaches(hi, lo) {
                    hi
                } else {
                    TypeId::BOTTOM
                }
            }
            (true, false) => self.leaf_below_proper(lo, hi),
            (false, true) => self.leaf_below_proper(hi, lo),
        }
    }

    /// Walk the parent chain of `leaf` while it stays in the leaf range.
    fn leaf_chain_reaches(&self, leaf: TypeId, ancestor: TypeId) -> bool {
        let mut t = leaf;
        while let Some(parent) = self.leaf_parent(t) {
            if parent == ancestor {
                return true;
            }
            t = parent;
        }
        false
    }

    /// `leaf` if one of its ancestors is subsumed by `proper`, else BOTTOM.
    fn leaf_below_proper(&self, leaf: TypeId, proper: TypeId) -> TypeId {
        let mut t = leaf;
        while let Some(parent) = self.leaf_parent(t) {
            t = parent;
        }
        if t == proper || self.codes[t.index()].is_subset(&self.codes[proper.index()]) {
            leaf
        } else {
            TypeId::BOTTOM
        }
    }

    // -------------------------------------------------------------------------
    // GLB cache
    // -------------------------------------------------------------------------

    pub fn glb_cache(&self) -> &GlbCache {
        &self.glb
    }

    /// Compute the GLB of every pair of grammar types.
    pub fn saturate_glb_cache(&self) {
        let count = self.type_count();
        for t1 in 1..count {
            for t2 in t1 + 1..count {
                self.unify(TypeId(t1), TypeId(t2));
            }
        }
        debug!(target: "tfs::lattice", entries = self.glb.len(), "glb cache saturated");
    }

    pub fn glb_cache_snapshot(&self) -> GlbTable {
        self.glb.snapshot()
    }

    pub fn dump_glb_cache<W: Write>(&self, out: W) -> io::Result<()> {
        write_glb_table(&self.glb.snapshot(), out)
    }

    /// Parse a dumped cache without touching this lattice's cache.
    pub fn read_glb_cache<R: BufRead>(&self, input: R) -> Result<GlbTable, GlbCacheError> {
        read_glb_cache(input, self.type_count())
    }

    /// Seed the cache from a dump. Returns the number of entries read.
    pub fn load_glb_cache<R: BufRead>(&self, input: R) -> Result<usize, GlbCacheError> {
        let table = self.read_glb_cache(input)?;
        self.glb.extend(&table);
        debug!(target: "tfs::lattice", entries = table.len(), "glb cache loaded");
        Ok(table.len())
    }
}

impl std::fmt::Debug for TypeLattice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeLattice")
            .field("types", &self.type_count())
            .field("first_leaf", &self.first_leaf)
            .field("atoms", &self.atom_count())
            .field("glb_cache", &self.glb.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/lattice_tests.rs"]
mod tests;
