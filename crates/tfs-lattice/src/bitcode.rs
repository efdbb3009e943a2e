//! Bit-vector codes of proper types.

use fixedbitset::FixedBitSet;
use std::hash::{Hash, Hasher};

/// Set of proper descendants of a type, one bit per proper type.
///
/// Equality and hashing only look at the set bits, so codes of different
/// lengths compare equal when they denote the same set.
#[derive(Clone, Debug, Default)]
pub struct Bitcode(FixedBitSet);

impl Bitcode {
    pub fn with_len(bits: usize) -> Self {
        Bitcode(FixedBitSet::with_capacity(bits))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Extend the code to `bits` bits; existing bits are kept.
    pub fn grow(&mut self, bits: usize) {
        self.0.grow(bits);
    }

    #[inline]
    pub fn insert(&mut self, bit: usize) {
        if bit >= self.0.len() {
            self.0.grow(bit + 1);
        }
        self.0.insert(bit);
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        self.0.contains(bit)
    }

    /// The all-zero code, i.e. BOTTOM.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.ones().next().is_none()
    }

    /// `self ⊆ other`: the type of `other` subsumes the type of `self`.
    #[inline]
    pub fn is_subset(&self, other: &Bitcode) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn intersection(&self, other: &Bitcode) -> Bitcode {
        let mut result = self.0.clone();
        result.intersect_with(&other.0);
        Bitcode(result)
    }

    pub fn union_with(&mut self, other: &Bitcode) {
        self.0.union_with(&other.0);
    }

    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.ones()
    }

    pub fn count_ones(&self) -> usize {
        self.0.count_ones(..)
    }
}

impl PartialEq for Bitcode {
    fn eq(&self, other: &Self) -> bool {
        self.0.ones().eq(other.0.ones())
    }
}

impl Eq for Bitcode {}

impl Hash for Bitcode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bit in self.0.ones() {
            bit.hash(state);
        }
    }
}
