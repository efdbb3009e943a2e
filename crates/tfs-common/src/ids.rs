//! Id newtypes shared by the lattice and the dag crates.

use std::fmt;

/// Dense identifier of a type.
///
/// `TOP` is always 0. Proper types come first, then leaf types; ids at or
/// above the lattice's type count are runtime atoms (string constants).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The universal supertype.
    pub const TOP: TypeId = TypeId(0);
    /// Failure of type unification. Never a legal node type.
    pub const BOTTOM: TypeId = TypeId(u32::MAX);

    #[inline]
    pub const fn is_top(self) -> bool {
        self.0 == Self::TOP.0
    }

    #[inline]
    pub const fn is_bottom(self) -> bool {
        self.0 == Self::BOTTOM.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            f.write_str("BOTTOM")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Dense identifier of a feature. Edges are kept sorted by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FeatureId(pub u32);

impl FeatureId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ids handed out by a [`crate::SymbolTable`].
pub trait SymbolId: Copy {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

impl SymbolId for TypeId {
    #[inline]
    fn from_index(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        TypeId(index as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SymbolId for FeatureId {
    #[inline]
    fn from_index(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize);
        FeatureId(index as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}
