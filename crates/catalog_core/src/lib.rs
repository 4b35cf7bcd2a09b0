//! Transactional entity-graph core for the music catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod id;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{LogTarget, LoggingConfig, StoreConfig};
pub use db::{CatalogDb, ConnectionError, ConnectionManager, DbError, RetryPolicy};
pub use id::{IdError, IdentifierGenerator, RandomIdGenerator};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::{
    parse_date, Album, AlbumSpec, Singer, SingerSpec, Track, TrackCount, ValidationError,
};
pub use model::entity::{EntityId, EntityKind, EntityMeta};
pub use repo::entity_store::{EntityStore, NewEntity, SqliteEntityStore, StoreError, StoreResult};
pub use repo::query::{AlbumPredicate, CompareOp, InvalidPredicateError, PredicateError, SingerPredicate};
pub use service::association_loader::AssociationLoader;
pub use service::graph_creator::{
    CreatedAlbum, CreatedGraph, GraphCause, GraphCreator, GraphError, GraphStep,
};
pub use service::seeder::{RandomDataSeeder, SeedReport, DEFAULT_TRACK_RANGE};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
