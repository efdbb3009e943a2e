//! Tracing configuration for debugging unification runs.
//!
//! Supports three output formats controlled by `TFS_LOG_FORMAT`:
//!
//! - `text` (default): standard `tracing-subscriber` flat output
//! - `tree`: hierarchical indented output via `tracing-tree`
//! - `json`: one JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! # Episode outcomes as an indented tree
//! TFS_LOG=tfs::episode=trace TFS_LOG_FORMAT=tree tfs -g grammar.json unify @a.fs @b.fs
//!
//! # Construction summaries (lattice size, glb types, cache loads) as JSON
//! TFS_LOG=debug TFS_LOG_FORMAT=json tfs -g grammar.json glb-cache --out glb.txt
//!
//! # Only the reader's warnings about unknown types
//! TFS_LOG=tfs::jxchg=warn tfs -g grammar.json subsumes @a.fs @b.fs
//! ```
//!
//! Targets: `tfs::lattice`, `tfs::grammar`, `tfs::episode`, `tfs::jxchg`,
//! `tfs::cli`. The subscriber is only initialised when `TFS_LOG` (or
//! `RUST_LOG`) is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a `TFS_LOG_FORMAT` value; anything unrecognised is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("TFS_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `TFS_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    match std::env::var("TFS_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `TFS_LOG` nor `RUST_LOG` is set. All output goes
/// to stderr so it never mixes with command results on stdout.
pub fn init_tracing() {
    if std::env::var_os("TFS_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true);

            Registry::default().with(filter).with(tree_layer).init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);

            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
