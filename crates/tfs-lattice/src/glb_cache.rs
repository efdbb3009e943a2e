//! Concurrent memo of greatest lower bounds, and its text persistence.
//!
//! The cache maps an unordered type pair to its GLB. Keys are canonical
//! (smaller id first) so both argument orders share one entry. Entries are
//! only ever added; the lattice is immutable once built, so a reader that
//! misses the cache recomputes the same value another thread may be writing.
//!
//! ## Persisted format
//!
//! One entry per line, three whitespace-separated integers:
//!
//! ```text
//! t1 t2 result
//! ```
//!
//! with `t1 <= t2` and `result = -1` for BOTTOM. Blank lines are ignored.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use tfs_common::TypeId;
use tfs_common::limits::GLB_CACHE_INITIAL_CAPACITY;
use tracing::trace;

/// Ordered snapshot of a GLB cache, keyed by canonical pair.
pub type GlbTable = BTreeMap<(TypeId, TypeId), TypeId>;

#[derive(Debug, thiserror::Error)]
pub enum GlbCacheError {
    #[error("failed to access glb cache: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected `t1 t2 result`, found `{text}`")]
    Malformed { line: usize, text: String },
    #[error("line {line}: type id {id} is outside the lattice ({count} types)")]
    OutOfRange { line: usize, id: i64, count: u32 },
}

/// Sharded concurrent map from canonical type pairs to their GLB.
pub struct GlbCache {
    map: DashMap<u64, TypeId, FxBuildHasher>,
}

#[inline]
fn pair_key(t1: TypeId, t2: TypeId) -> u64 {
    debug_assert!(t1 <= t2);
    (u64::from(t1.0) << 32) | u64::from(t2.0)
}

#[inline]
fn key_pair(key: u64) -> (TypeId, TypeId) {
    (TypeId((key >> 32) as u32), TypeId(key as u32))
}

impl GlbCache {
    pub fn new() -> Self {
        Self::with_capacity(GLB_CACHE_INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GlbCache {
            map: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    /// Look up a canonical pair (`t1 <= t2`).
    #[inline]
    pub fn get(&self, t1: TypeId, t2: TypeId) -> Option<TypeId> {
        self.map.get(&pair_key(t1, t2)).map(|entry| *entry)
    }

    /// Record the GLB of a canonical pair. An existing entry is kept.
    #[inline]
    pub fn insert(&self, t1: TypeId, t2: TypeId, glb: TypeId) {
        self.map.entry(pair_key(t1, t2)).or_insert(glb);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn snapshot(&self) -> GlbTable {
        self.map
            .iter()
            .map(|entry| (key_pair(*entry.key()), *entry.value()))
            .collect()
    }

    /// Merge a table into the cache. Returns the number of new entries.
    pub fn extend(&self, table: &GlbTable) -> usize {
        let before = self.map.len();
        for (&(t1, t2), &glb) in table {
            let (t1, t2) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            self.insert(t1, t2, glb);
        }
        let added = self.map.len() - before;
        trace!(target: "tfs::lattice", added, total = self.map.len(), "glb cache extended");
        added
    }
}

impl Default for GlbCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a table in the persisted format, sorted by pair.
pub fn write_glb_table<W: Write>(table: &GlbTable, mut out: W) -> io::Result<()> {
    for (&(t1, t2), &glb) in table {
        if glb.is_bottom() {
            writeln!(out, "{} {} -1", t1.0, t2.0)?;
        } else {
            writeln!(out, "{} {} {}", t1.0, t2.0, glb.0)?;
        }
    }
    out.flush()
}

/// Parse a persisted cache. `type_count` bounds the accepted ids.
pub fn read_glb_cache<R: BufRead>(input: R, type_count: u32) -> Result<GlbTable, GlbCacheError> {
    let mut table = GlbTable::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let fields: Vec<i64> = text
            .split_whitespace()
            .map(str::parse::<i64>)
            .collect::<Result<_, _>>()
            .map_err(|_| GlbCacheError::Malformed {
                line: number,
                text: text.to_owned(),
            })?;
        let [t1, t2, glb] = fields[..] else {
            return Err(GlbCacheError::Malformed {
                line: number,
                text: text.to_owned(),
            });
        };
        let t1 = checked_type(t1, number, type_count)?;
        let t2 = checked_type(t2, number, type_count)?;
        let glb = if glb == -1 {
            TypeId::BOTTOM
        } else {
            checked_type(glb, number, type_count)?
        };
        let key = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        table.insert(key, glb);
    }
    Ok(table)
}

fn checked_type(id: i64, line: usize, count: u32) -> Result<TypeId, GlbCacheError> {
    if id < 0 || id >= i64::from(count) {
        return Err(GlbCacheError::OutOfRange { line, id, count });
    }
    Ok(TypeId(id as u32))
}
