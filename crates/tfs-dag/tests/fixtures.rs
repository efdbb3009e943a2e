//! Grammar and feature structures shared by the unit tests.
//!
//! ```text
//!            *top*
//!   /     /   |   \     \      \     \
//! *list*  f   j   rule  string  "+"
//!  /  \  / \        |
//! *cons* g  h      $k
//! *null*  \/
//!         i
//! ```

use crate::arena::NodeId;
use crate::grammar::Grammar;
use crate::session::Session;
use crate::tfs::Tfs;
use tfs_lattice::LatticeBuilder;

pub(crate) const FEATURES: [&str; 7] = ["FIRST", "REST", "ARGS", "G", "H", "I", "KEY-ARG"];

pub(crate) fn test_grammar() -> Grammar {
    let mut lattice = LatticeBuilder::new();
    let decls: [(&str, &[&str]); 12] = [
        ("*list*", &["*top*"]),
        ("*cons*", &["*list*"]),
        ("*null*", &["*list*"]),
        ("f", &["*top*"]),
        ("g", &["f"]),
        ("h", &["f"]),
        ("i", &["g", "h"]),
        ("j", &["*top*"]),
        ("rule", &["*top*"]),
        ("$k", &["rule"]),
        ("string", &["*top*"]),
        ("+", &["*top*"]),
    ];
    for (name, parents) in decls {
        lattice.declare(name, parents.iter().copied()).expect("valid declaration");
    }
    let mut builder = Grammar::builder(lattice.build().expect("valid lattice"));
    builder.features(FEATURES);
    builder
        .prototype("i", "[ i G [ *top* ] H [ *top* ] I [ *top* ] ]")
        .expect("prototype of i");
    builder.prototype("g", "[ g G [ *top* ] ]").expect("prototype of g");
    let qc_paths: [&[&str]; 5] = [&[], &["FIRST"], &["REST", "FIRST"], &["ARGS"], &["ARGS", "FIRST"]];
    builder.quick_check_paths(&qc_paths).expect("quick-check paths");
    builder.build()
}

/// Structures compared pairwise by the unification and subsumption tables.
pub(crate) const BASE: [&str; 13] = [
    "[ *cons* FIRST [ *top* ] ]",
    "[ *cons* FIRST [ *top* ] REST [ *top* ] ]",
    "[ *cons* FIRST [ *top* ] REST [ *cons* FIRST [ f ] ] ]",
    "[ *cons* FIRST [ *cons* ] ]",
    "[ *cons* FIRST # 1 [ f ] REST [ *cons* FIRST # 1 ] ]",
    "[ *cons* FIRST # 1 [ f ] ARGS [ *top* ] REST [ *cons* FIRST # 1 ] ]",
    "[ *cons* FIRST # 1 [ j ] ARGS [ *top* FIRST [ j ] ] REST [ *cons* FIRST # 1 ] ]",
    "[ *cons* FIRST # 1 [ j ] REST # 2 [ *cons* FIRST # 1 ] ARGS # 2 ]",
    "[ *cons* FIRST [ *cons* FIRST # 1 [ *top* ARGS [ *top* ] ] REST # 1 ] ]",
    "[ *cons* FIRST [ *cons* FIRST # 1 [ *top* FIRST [ *top* ] ARGS # 2 [ *top* ] ] REST # 1 ] ARGS # 2 ]",
    "[ *cons* FIRST #1 [ j ] REST #1 ]",
    "[ *cons* FIRST [ j ] REST [ j ] ]",
    "[ *cons* FIRST #1 [ *cons* FIRST #1 ] ]",
];

/// Index of the cyclic entry of [`BASE`].
pub(crate) const CYCLIC_BASE: usize = 12;

/// Further cyclic structures.
pub(crate) const CYCLIC: [&str; 3] = [
    "[ *cons* FIRST #1 [ *top* ARGS #1 ] REST #2 [ *cons* FIRST #1 REST #2 ] ]",
    "[ h FIRST # 1 [ f ARGS [ *top* ] REST # 1 ] REST [ h FIRST [ h ] REST [ g ] ] ]",
    "# 1 [ *top* FIRST # 1 ]",
];

pub(crate) fn parse(session: &mut Session<'_>, text: &str) -> NodeId {
    session
        .parse(text)
        .unwrap_or_else(|err| panic!("{text}: {err}"))
}

pub(crate) fn parse_tfs(session: &mut Session<'_>, text: &str) -> Tfs {
    session
        .parse_tfs(text)
        .unwrap_or_else(|err| panic!("{text}: {err}"))
}

pub(crate) fn parse_all(session: &mut Session<'_>, texts: &[&str]) -> Vec<NodeId> {
    texts.iter().map(|text| parse(session, text)).collect()
}
