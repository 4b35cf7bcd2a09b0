//! Predicate-driven reads with eager association hydration.
//!
//! # Responsibility
//! - Return singers (or albums) matching a predicate with children attached.
//!
//! # Invariants
//! - Every returned singer carries all its albums, and every album all its tracks.
//! - Each call reads one consistent snapshot (single deferred transaction on
//!   its own pooled connection); concurrent writers are not held back by it.
//! - No match yields an empty sequence; "not found" mapping belongs to callers.

use crate::db::CatalogDb;
use crate::model::catalog::{Album, Singer};
use crate::model::entity::EntityId;
use crate::repo::entity_store::{EntityStore, SqliteEntityStore, StoreResult};
use crate::repo::query::{AlbumPredicate, SingerPredicate};
use log::{debug, error};
use rusqlite::Connection;
use std::time::Instant;

/// Read facade over the shared catalog connection.
#[derive(Clone)]
pub struct AssociationLoader {
    db: CatalogDb,
}

impl AssociationLoader {
    pub fn new(db: CatalogDb) -> Self {
        Self { db }
    }

    /// Loads fully hydrated singers matching `predicate`.
    pub fn load_singers(&self, predicate: &SingerPredicate) -> StoreResult<Vec<Singer>> {
        self.read("singers", |conn| {
            SqliteEntityStore::new(conn).find_singers(predicate, true)
        })
    }

    /// Loads one hydrated singer by id.
    pub fn load_singer(&self, id: &EntityId) -> StoreResult<Option<Singer>> {
        let mut singers = self.load_singers(&SingerPredicate::IdEquals(id.clone()))?;
        Ok(singers.pop())
    }

    /// Loads albums matching `predicate` with their tracks attached.
    pub fn load_albums(&self, predicate: &AlbumPredicate) -> StoreResult<Vec<Album>> {
        self.read("albums", |conn| {
            SqliteEntityStore::new(conn).find_albums(predicate, true)
        })
    }

    fn read<T, F>(&self, target: &'static str, f: F) -> StoreResult<Vec<T>>
    where
        F: FnOnce(&Connection) -> StoreResult<Vec<T>>,
    {
        let started_at = Instant::now();
        let mut conn = self.db.conn()?;
        let tx = conn.transaction()?;
        let result = f(&tx);
        // Read-only: finishing the snapshot either way releases the WAL read mark.
        tx.finish()?;

        match result {
            Ok(rows) => {
                debug!(
                    "event=graph_load module=service status=ok target={} row_count={} duration_ms={}",
                    target,
                    rows.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(err) => {
                error!(
                    "event=graph_load module=service status=error target={} duration_ms={} error={}",
                    target,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}
