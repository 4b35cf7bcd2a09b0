//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate entity store calls into graph-level create and load APIs.
//! - Keep CLI and other callers decoupled from SQL details.

pub mod association_loader;
pub mod graph_creator;
pub mod seeder;
