//! Destructive unification of typed feature structures.
//!
//! Dags live in a [`DagArena`] owned by a [`Session`]. A session borrows a
//! [`Grammar`] (type lattice, features, type prototypes, quick-check paths)
//! and runs one *episode* at a time: a unification, a subsumption check, a
//! copy, or an analysis walk. Episodes keep their state in per-node scratch
//! slots stamped with the arena's generation, and end by advancing the
//! generation, which resets every slot at once.
//!
//! ```text
//! Session::unify_dags(a, b)
//!   unify_step      in-place, result entangled with the inputs
//!   copy_result     fresh committed nodes, restrictor applied, cycles rejected
//!   invalidate      next generation
//! ```

mod analysis;
pub mod arena;
mod copy;
pub mod failure;
pub mod grammar;
pub mod jxchg;
pub mod quick_check;
pub mod restrictor;
mod session;
mod subsume;
mod tfs;
mod unfill;
mod unify;

pub use arena::{DagArena, Edge, NodeId};
pub use copy::CopyError;
pub use failure::{FailureKind, FailureLog};
pub use grammar::{
    Appropriateness, Grammar, GrammarBuilder, GrammarDescription, GrammarError, TypeDecl,
};
pub use jxchg::{DagDisplay, JxchgError, JxchgReader, Tokenizer, build_from_token_stream};
pub use quick_check::{QcError, QcPaths, QcVector};
pub use restrictor::{
    DeleteSet, RestrictMode, Restrictor, RestrictorError, RestrictorId, RestrictorNode,
    RestrictorTree,
};
pub use session::Session;
pub use subsume::Subsumption;
pub use tfs::Tfs;
pub use tfs_common::{FeatureId, TypeId};

#[cfg(test)]
#[path = "../tests/fixtures.rs"]
pub(crate) mod fixtures;
