//! Implementations of the `tfs` subcommands.
//!
//! Results go to the caller's writer; failures of the operation itself
//! (a type clash, a cyclic result) are reported there too and turn into a
//! non-zero exit code rather than an error.

use crate::args::{CliArgs, Command};
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tfs_common::TypeId;
use tfs_dag::{Grammar, NodeId, Restrictor, RestrictorTree, Session, Subsumption};
use tracing::debug;

/// Exit status when the command's operation succeeded.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status when the operation itself failed (no GLB, no unifier).
pub const EXIT_FAILURE: u8 = 1;

pub fn load_grammar(path: &Path) -> Result<Grammar> {
    let file = File::open(path)
        .with_context(|| format!("failed to open grammar {}", path.display()))?;
    Grammar::from_json(BufReader::new(file))
        .with_context(|| format!("failed to load grammar {}", path.display()))
}

/// Seed the grammar's GLB cache from a dump; returns the number of entries.
pub fn load_glb_cache(grammar: &Grammar, path: &Path) -> Result<usize> {
    let file = File::open(path)
        .with_context(|| format!("failed to open GLB cache {}", path.display()))?;
    grammar
        .lattice()
        .load_glb_cache(BufReader::new(file))
        .with_context(|| format!("failed to read GLB cache {}", path.display()))
}

/// jxchg text of a command-line argument: the argument itself, or the
/// contents of the file named after a leading `@`.
pub fn fs_text(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {path}")),
        None => Ok(arg.to_string()),
    }
}

pub fn run(args: &CliArgs, out: &mut impl Write) -> Result<u8> {
    let grammar = load_grammar(&args.grammar)?;
    debug!(target: "tfs::cli", grammar = ?grammar, "grammar loaded");
    if let Some(path) = &args.glb_cache {
        let entries = load_glb_cache(&grammar, path)?;
        debug!(target: "tfs::cli", entries, "glb cache seeded");
    }
    execute(&grammar, &args.command, out)
}

pub fn execute(grammar: &Grammar, command: &Command, out: &mut impl Write) -> Result<u8> {
    match command {
        Command::Glb { first, second } => glb(grammar, first, second, out),
        Command::Unify {
            first,
            second,
            restrictor,
            restrict,
            failures,
        } => {
            let mut session = grammar.session();
            session.record_failures(*failures);
            let explicit = restrictor
                .as_deref()
                .map(|text| parse_restrictor(&mut session, text))
                .transpose()?;
            let restrictor = explicit.as_ref().or(restrict.then(|| grammar.restrictor()));
            unify(&mut session, first, second, restrictor, out)
        }
        Command::Subsumes { first, second } => subsumes(grammar, first, second, out),
        Command::GlbCache { out: path, saturate } => glb_cache(grammar, path, *saturate, out),
    }
}

fn type_id(grammar: &Grammar, name: &str) -> Result<TypeId> {
    match grammar.type_id(name) {
        Some(ty) => Ok(ty),
        None => bail!("unknown type `{name}`"),
    }
}

fn glb(grammar: &Grammar, first: &str, second: &str, out: &mut impl Write) -> Result<u8> {
    let lattice = grammar.lattice();
    let glb = lattice.unify(type_id(grammar, first)?, type_id(grammar, second)?);
    if glb.is_bottom() {
        writeln!(out, "{glb}")?;
        return Ok(EXIT_FAILURE);
    }
    match lattice.type_name(glb) {
        Some(name) => writeln!(out, "{name}")?,
        None => writeln!(out, "{glb}")?,
    }
    Ok(EXIT_SUCCESS)
}

fn parse(session: &mut Session<'_>, arg: &str) -> Result<NodeId> {
    let text = fs_text(arg)?;
    session
        .parse(&text)
        .with_context(|| format!("malformed feature structure `{arg}`"))
}

/// Restrictor from a pseudo-dag, combined with the grammar's delete set.
fn parse_restrictor(session: &mut Session<'_>, arg: &str) -> Result<Restrictor> {
    let root = parse(session, arg)?;
    let grammar = session.grammar();
    let tree = RestrictorTree::from_pseudo_dag(session.arena(), root, grammar.lattice())
        .with_context(|| format!("invalid restrictor `{arg}`"))?;
    Ok(Restrictor::Tree(tree.with_delete_set(grammar.delete_set().clone())))
}

fn unify(
    session: &mut Session<'_>,
    first: &str,
    second: &str,
    restrictor: Option<&Restrictor>,
    out: &mut impl Write,
) -> Result<u8> {
    let a = parse(session, first)?;
    let b = parse(session, second)?;
    if let Some(root) = session.unify_dags_restricted(a, b, restrictor) {
        writeln!(out, "{}", session.display(root))?;
        return Ok(EXIT_SUCCESS);
    }
    writeln!(out, "unification failed")?;
    if let Some(log) = session.take_failures() {
        let mut entries: Vec<_> = log.forward.into_iter().collect();
        entries.sort_unstable_by_key(|&(node, _)| node);
        for (node, kind) in entries {
            writeln!(out, "  {kind} at {node}")?;
        }
    }
    Ok(EXIT_FAILURE)
}

fn subsumes(grammar: &Grammar, first: &str, second: &str, out: &mut impl Write) -> Result<u8> {
    let mut session = grammar.session();
    let a = parse(&mut session, first)?;
    let b = parse(&mut session, second)?;
    let relation = session.subsumes_bidirectional(a, b);
    let verdict = if relation == Subsumption::EQUAL {
        "equal"
    } else if relation.contains(Subsumption::THIS_MORE_GENERAL) {
        "first subsumes second"
    } else if relation.contains(Subsumption::ARG_MORE_GENERAL) {
        "second subsumes first"
    } else {
        "incomparable"
    };
    writeln!(out, "{verdict}")?;
    Ok(EXIT_SUCCESS)
}

fn glb_cache(grammar: &Grammar, path: &Path, saturate: bool, out: &mut impl Write) -> Result<u8> {
    let lattice = grammar.lattice();
    if saturate {
        lattice.saturate_glb_cache();
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    lattice
        .dump_glb_cache(&mut writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(out, "wrote {} entries to {}", lattice.glb_cache().len(), path.display())?;
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
#[path = "../tests/commands_tests.rs"]
mod tests;
