//! Common types for the tfs unification engine.
//!
//! This crate provides the small building blocks every other crate needs:
//! - `TypeId` / `FeatureId` newtypes with their reserved constants
//! - `SymbolTable` for dense name↔id mapping
//! - Centralized limits for recursion and cache sizing

pub mod ids;
pub mod limits;
pub mod symbols;

pub use ids::{FeatureId, SymbolId, TypeId};
pub use symbols::SymbolTable;
