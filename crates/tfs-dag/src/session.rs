//! Per-thread unification context.

use crate::arena::{DagArena, NodeId};
use crate::failure::{FailureKind, FailureLog};
use crate::grammar::Grammar;
use crate::jxchg::{DagDisplay, JxchgError};
use tfs_common::limits::ARENA_INITIAL_CAPACITY;

/// A grammar plus one arena of dag nodes.
///
/// Every episode (unification, subsumption, copy, analysis) borrows the
/// session mutably, so episodes on one arena never interleave. Threads
/// share the [`Grammar`] and each run their own session.
pub struct Session<'g> {
    pub(crate) grammar: &'g Grammar,
    pub(crate) arena: DagArena,
    pub(crate) failures: Option<FailureLog>,
    pub(crate) wellformed_depth: u32,
}

impl<'g> Session<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Session {
            grammar,
            arena: DagArena::with_capacity(ARENA_INITIAL_CAPACITY),
            failures: None,
            wellformed_depth: 0,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn arena(&self) -> &DagArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut DagArena {
        &mut self.arena
    }

    /// Read a dag from jxchg text into this session's arena.
    pub fn parse(&mut self, text: &str) -> Result<NodeId, JxchgError> {
        self.grammar.reader().parse(&mut self.arena, text)
    }

    /// Copy a dag of another arena (another session, or the prototypes)
    /// into this one.
    pub fn import(&mut self, source: &DagArena, root: NodeId) -> NodeId {
        self.arena.import(source, root)
    }

    pub fn display(&self, root: NodeId) -> DagDisplay<'_> {
        self.grammar.display(&self.arena, root)
    }

    /// Abandon the current episode: all scratch state becomes stale.
    pub fn invalidate(&mut self) {
        self.arena.invalidate();
    }

    /// Turn failure recording on or off. Turning it on starts a fresh log.
    pub fn record_failures(&mut self, enabled: bool) {
        self.failures = enabled.then(FailureLog::new);
    }

    pub fn failures(&self) -> Option<&FailureLog> {
        self.failures.as_ref()
    }

    pub fn take_failures(&mut self) -> Option<FailureLog> {
        self.failures.as_mut().map(std::mem::take)
    }

    #[inline]
    pub(crate) fn record(&mut self, left: NodeId, right: NodeId, kind: FailureKind) {
        if let Some(log) = self.failures.as_mut() {
            log.record(left, right, kind);
        }
    }
}
