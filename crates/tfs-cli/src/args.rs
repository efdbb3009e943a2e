use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the tfs binary.
#[derive(Parser, Debug)]
#[command(
    name = "tfs",
    version,
    about = "Typed feature structure unification against a JSON grammar"
)]
pub struct CliArgs {
    /// Grammar description (JSON).
    #[arg(short = 'g', long)]
    pub grammar: PathBuf,

    /// Seed the GLB cache from a dump before running the command.
    #[arg(long = "glb-cache")]
    pub glb_cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Feature structures are given as jxchg text, or as `@path` to read the
/// text from a file.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the greatest lower bound of two types.
    Glb { first: String, second: String },

    /// Unify two feature structures and print the result.
    Unify {
        first: String,
        second: String,
        /// Restrictor pseudo-dag applied while copying the result.
        #[arg(long)]
        restrictor: Option<String>,
        /// Copy through the grammar's default restrictor.
        #[arg(long, conflicts_with = "restrictor")]
        restrict: bool,
        /// On failure, list the nodes where unification failed.
        #[arg(long)]
        failures: bool,
    },

    /// Compare two feature structures by subsumption.
    Subsumes { first: String, second: String },

    /// Write the GLB cache to a file.
    GlbCache {
        #[arg(long)]
        out: PathBuf,
        /// Compute every pair of grammar types first.
        #[arg(long)]
        saturate: bool,
    },
}

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod tests;
