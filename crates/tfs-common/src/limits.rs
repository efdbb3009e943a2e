//! Centralized limits and thresholds for the unification engine.
//!
//! # Categories
//!
//! - **Stack growth**: red zone and segment size handed to `stacker` by the
//!   recursive dag walks (unify, copy, subsumption, analyses)
//! - **Capacity hints**: pre-allocation sizes for caches and arenas
//! - **Restriction**: how far the special restriction follows `SLASH`
//! - **Diagnostics thresholds**: points at which a warning is emitted

// =============================================================================
// Stack growth
// =============================================================================

/// Remaining stack below which a recursive dag walk allocates a new segment.
///
/// Feature structures in large grammars nest a few hundred levels deep
/// (long `REST` chains, difference lists); every level costs one frame.
pub const STACK_RED_ZONE: usize = 64 * 1024;

/// Size of each additional stack segment allocated by `stacker`.
pub const STACK_GROWTH: usize = 1024 * 1024;

// =============================================================================
// Capacity hints
// =============================================================================

/// Initial capacity of the GLB cache.
///
/// A grammar with a few thousand types touches on the order of 10^4 distinct
/// pairs while parsing a realistic corpus.
pub const GLB_CACHE_INITIAL_CAPACITY: usize = 16 * 1024;

/// Initial node capacity of a fresh session arena.
pub const ARENA_INITIAL_CAPACITY: usize = 1024;

// =============================================================================
// Lattice construction
// =============================================================================

/// Maximum number of fixpoint rounds when closing the proper-type codes under
/// intersection.
///
/// Every round adds at least one glb type; real hierarchies converge in a
/// handful of rounds.
pub const MAX_GLB_CLOSURE_ROUNDS: usize = 256;

// =============================================================================
// Restriction
// =============================================================================

/// Number of nested `SLASH` values a special restriction descends through;
/// the difference list reached at this depth is emptied.
pub const MAX_SLASH_DEPTH: u32 = 999;

// =============================================================================
// Diagnostics thresholds
// =============================================================================

/// Nesting depth of wellformedness completions at which a warning is logged.
///
/// Completion re-enters unification against a type's prototype, which can
/// itself promote types and trigger further completions. The nesting is not
/// bounded; a self-referential prototype loops until memory runs out. The
/// warning makes such grammars visible without changing unification results.
pub const WELLFORMED_DEPTH_WARNING: u32 = 64;
