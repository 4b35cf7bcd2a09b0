//! Catalog domain model shared by store, creation and loading code.
//!
//! # Responsibility
//! - Define the embedded base fields (`EntityMeta`) carried by every row.
//! - Define the three entity levels: singer -> album -> track.
//! - Define creation inputs and their validation rules.
//!
//! # Invariants
//! - Every persisted entity is identified by an `EntityId` assigned once,
//!   before its first insert, and never reassigned.
//! - Child rows always reference exactly one owner row.

pub mod catalog;
pub mod entity;
