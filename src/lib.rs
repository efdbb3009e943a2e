//! Typed feature structure unification.
//!
//! Facade over the workspace crates:
//!
//! - [`common`]: type and feature ids, symbol tables, limits
//! - [`lattice`]: the bit-coded type hierarchy and its GLB cache
//! - [`dag`]: arenas, sessions, unification, subsumption, restrictors,
//!   quick check and the jxchg text format
//!
//! ```text
//! let grammar = Grammar::from_json(file)?;
//! let mut session = grammar.session();
//! let a = session.parse_tfs("[ *cons* FIRST [ f ] ]")?;
//! let b = session.parse_tfs("[ *cons* FIRST [ g ] ]")?;
//! let unified = session.unify(&a, &b);
//! ```

// Common types - ids, symbol tables and centralized limits
pub use tfs_common as common;
pub use tfs_common::limits;
pub use tfs_common::{FeatureId, TypeId};

// Type lattice and GLB cache
pub use tfs_lattice as lattice;
pub use tfs_lattice::{LatticeBuilder, LatticeError, TypeLattice};

// Dags, sessions and the operations on them
pub use tfs_dag as dag;
pub use tfs_dag::{
    CopyError, DagArena, FailureKind, FailureLog, Grammar, GrammarBuilder, GrammarDescription,
    GrammarError, JxchgError, NodeId, QcVector, RestrictMode, Restrictor, RestrictorTree, Session,
    Subsumption, Tfs,
};

// Tracing configuration for the binaries
pub mod tracing_config;
#[cfg(test)]
#[path = "tests/tracing_config_tests.rs"]
mod tracing_config_tests;
