//! Type lattice for typed feature structures.
//!
//! Types form a multiple-inheritance hierarchy rooted at `*top*`. The lattice
//! splits them in two ranges:
//!
//! - **Proper types** carry a bitcode (the set of their proper descendants);
//!   the greatest lower bound of two proper types is the type whose code is the
//!   intersection of both codes.
//! - **Leaf types** have a single parent and only leaf descendants; their GLBs
//!   are found by walking parent chains, so they need no code bits.
//!
//! Runtime atoms (string constants introduced while reading structures) get
//! ids above the grammar types and relate only to `*top*` and themselves.
//!
//! Every computed GLB is memoized in a concurrent cache that can be dumped to
//! and restored from a line-oriented text file.

mod bitcode;
mod builder;
mod glb_cache;
mod lattice;

pub use bitcode::Bitcode;
pub use builder::{LatticeBuilder, LatticeError};
pub use glb_cache::{GlbCache, GlbCacheError, GlbTable, read_glb_cache, write_glb_table};
pub use lattice::{TOP_TYPE_NAME, TypeLattice};
pub use tfs_common::TypeId;
