//! Repository layer: entity store contract and query predicates.
//!
//! # Responsibility
//! - Define single-row create and predicate-driven read primitives.
//! - Isolate SQLite query details from graph orchestration.
//!
//! # Invariants
//! - Store writes validate their input before persistence.
//! - Store reads return an empty sequence, not an error, when nothing matches.

pub mod entity_store;
pub mod query;
