//! Name tables for types and features.
//!
//! Ids are assigned densely in insertion order and never change afterwards.

use crate::ids::SymbolId;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::marker::PhantomData;

/// Bidirectional name↔id mapping.
pub struct SymbolTable<I> {
    names: IndexSet<String, FxBuildHasher>,
    _marker: PhantomData<I>,
}

impl<I: SymbolId> SymbolTable<I> {
    pub fn new() -> Self {
        Self {
            names: IndexSet::default(),
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: IndexSet::with_capacity_and_hasher(capacity, FxBuildHasher),
            _marker: PhantomData,
        }
    }

    /// Return the id of `name`, registering it if it is new.
    pub fn intern(&mut self, name: &str) -> I {
        if let Some(index) = self.names.get_index_of(name) {
            return I::from_index(index);
        }
        let (index, _) = self.names.insert_full(name.to_owned());
        I::from_index(index)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<I> {
        self.names.get_index_of(name).map(I::from_index)
    }

    #[inline]
    pub fn name(&self, id: I) -> Option<&str> {
        self.names.get_index(id.index()).map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, id: I) -> bool {
        id.index() < self.names.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (I::from_index(index), name.as_str()))
    }
}

impl<I: SymbolId> Default for SymbolTable<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Clone for SymbolTable<I> {
    fn clone(&self) -> Self {
        Self {
            names: self.names.clone(),
            _marker: PhantomData,
        }
    }
}

impl<I> fmt::Debug for SymbolTable<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names.iter()).finish()
    }
}

#[cfg(test)]
#[path = "../tests/symbols_tests.rs"]
mod tests;
