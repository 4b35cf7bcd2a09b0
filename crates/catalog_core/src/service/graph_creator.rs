//! Atomic creation of a singer with its albums and tracks.
//!
//! # Responsibility
//! - Assign identifiers to every row of one entity graph.
//! - Insert the whole graph inside one IMMEDIATE transaction.
//!
//! # Invariants
//! - Either every row of a call is committed, or none is visible to readers.
//! - Children are inserted after their owner, in caller order.
//! - Failures name the step that failed; nothing is retried here.

use crate::db::{CatalogDb, DbError};
use crate::id::{IdError, IdentifierGenerator, RandomIdGenerator};
use crate::model::catalog::{AlbumSpec, SingerSpec, TrackCount, TrackSpec, ValidationError};
use crate::model::entity::{EntityId, EntityKind};
use crate::repo::entity_store::{EntityStore, NewEntity, SqliteEntityStore, StoreError};
use log::{error, info};
use rand::Rng;
use rusqlite::{Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const MIN_TRACK_SECS: u32 = 90;
const MAX_TRACK_SECS: u32 = 420;

/// Identifiers of one committed graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedGraph {
    pub singer_id: EntityId,
    pub albums: Vec<CreatedAlbum>,
}

impl CreatedGraph {
    pub fn album_ids(&self) -> Vec<EntityId> {
        self.albums.iter().map(|album| album.id.clone()).collect()
    }

    pub fn track_count(&self) -> usize {
        self.albums.iter().map(|album| album.track_ids.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedAlbum {
    pub id: EntityId,
    pub track_ids: Vec<EntityId>,
}

/// Step of graph creation at which a failure happened.
///
/// Album indexes are 0-based positions in the caller's album list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStep {
    BeginTransaction,
    SingerId,
    InsertSinger,
    AlbumId { index: usize },
    InsertAlbum { index: usize },
    TrackId { album_index: usize, track_number: u32 },
    InsertTrack { album_index: usize, track_number: u32 },
    Commit,
}

impl Display for GraphStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeginTransaction => write!(f, "begin transaction"),
            Self::SingerId => write!(f, "generate singer id"),
            Self::InsertSinger => write!(f, "insert singer"),
            Self::AlbumId { index } => write!(f, "generate id for album #{}", index + 1),
            Self::InsertAlbum { index } => write!(f, "insert album #{}", index + 1),
            Self::TrackId {
                album_index,
                track_number,
            } => write!(
                f,
                "generate id for track {track_number} of album #{}",
                album_index + 1
            ),
            Self::InsertTrack {
                album_index,
                track_number,
            } => write!(f, "insert track {track_number} of album #{}", album_index + 1),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Underlying cause of a failed graph step.
#[derive(Debug)]
pub enum GraphCause {
    Id(IdError),
    Store(StoreError),
}

impl Display for GraphCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl From<IdError> for GraphCause {
    fn from(value: IdError) -> Self {
        Self::Id(value)
    }
}

impl From<StoreError> for GraphCause {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DbError> for GraphCause {
    fn from(value: DbError) -> Self {
        Self::Store(StoreError::Db(value))
    }
}

impl From<rusqlite::Error> for GraphCause {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::from(value))
    }
}

/// Failure of one graph creation call. No row of that call is persisted.
#[derive(Debug)]
pub enum GraphError {
    /// Input rejected before any store access. `position` is the album index.
    Validation {
        entity: EntityKind,
        position: Option<usize>,
        error: ValidationError,
    },
    Step { step: GraphStep, cause: GraphCause },
}

impl GraphError {
    fn at(step: GraphStep, cause: impl Into<GraphCause>) -> Self {
        Self::Step {
            step,
            cause: cause.into(),
        }
    }

    /// Failing step, or `None` for validation failures.
    pub fn step(&self) -> Option<GraphStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            Self::Validation { .. } => None,
        }
    }
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation {
                entity,
                position: Some(index),
                error,
            } => write!(f, "invalid {entity} #{}: {error}", index + 1),
            Self::Validation {
                entity,
                position: None,
                error,
            } => write!(f, "invalid {entity}: {error}"),
            Self::Step { step, cause } => {
                write!(f, "graph creation failed at {step}: {cause}")
            }
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation { error, .. } => Some(error),
            Self::Step {
                cause: GraphCause::Id(err),
                ..
            } => Some(err),
            Self::Step {
                cause: GraphCause::Store(err),
                ..
            } => Some(err),
        }
    }
}

/// Orchestrates atomic singer/album/track graph creation.
pub struct GraphCreator<G = RandomIdGenerator> {
    db: CatalogDb,
    ids: G,
}

impl GraphCreator<RandomIdGenerator> {
    pub fn new(db: CatalogDb) -> Self {
        Self::with_generator(db, RandomIdGenerator)
    }
}

impl<G: IdentifierGenerator> GraphCreator<G> {
    pub fn with_generator(db: CatalogDb, ids: G) -> Self {
        Self { db, ids }
    }

    pub fn db(&self) -> &CatalogDb {
        &self.db
    }

    /// Creates one singer with `albums` (and their tracks) atomically.
    pub fn create_graph(
        &self,
        singer: &SingerSpec,
        albums: &[AlbumSpec],
    ) -> Result<CreatedGraph, GraphError> {
        self.create_graph_with_rng(singer, albums, &mut rand::thread_rng())
    }

    /// Same as `create_graph`, with `rng` driving track counts and durations.
    pub fn create_graph_with_rng<R: Rng + ?Sized>(
        &self,
        singer: &SingerSpec,
        albums: &[AlbumSpec],
        rng: &mut R,
    ) -> Result<CreatedGraph, GraphError> {
        validate_graph(singer, albums)?;

        let started_at = Instant::now();
        info!(
            "event=graph_create module=service status=start album_count={}",
            albums.len()
        );

        let mut conn = self
            .db
            .conn()
            .map_err(|err| GraphError::at(GraphStep::BeginTransaction, err))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| GraphError::at(GraphStep::BeginTransaction, err))?;

        // Dropping `tx` on the error path rolls back every row of this call.
        let created = match self.insert_graph(&tx, singer, albums, rng) {
            Ok(created) => created,
            Err(err) => {
                error!(
                    "event=graph_create module=service status=error duration_ms={} step=\"{}\" error={}",
                    started_at.elapsed().as_millis(),
                    err.step().map_or_else(String::new, |step| step.to_string()),
                    err
                );
                return Err(err);
            }
        };

        tx.commit()
            .map_err(|err| GraphError::at(GraphStep::Commit, err))?;

        info!(
            "event=graph_create module=service status=ok duration_ms={} singer_id={} album_count={} track_count={}",
            started_at.elapsed().as_millis(),
            created.singer_id,
            created.albums.len(),
            created.track_count()
        );
        Ok(created)
    }

    fn insert_graph<R: Rng + ?Sized>(
        &self,
        tx: &Transaction<'_>,
        singer: &SingerSpec,
        albums: &[AlbumSpec],
        rng: &mut R,
    ) -> Result<CreatedGraph, GraphError> {
        let store = SqliteEntityStore::new(tx);

        let singer_id = self
            .ids
            .generate()
            .map_err(|err| GraphError::at(GraphStep::SingerId, err))?;
        store
            .create(NewEntity::Singer {
                id: &singer_id,
                spec: singer,
            })
            .map_err(|err| GraphError::at(GraphStep::InsertSinger, err))?;

        let mut created_albums = Vec::with_capacity(albums.len());
        for (index, album) in albums.iter().enumerate() {
            let album_id = self
                .ids
                .generate()
                .map_err(|err| GraphError::at(GraphStep::AlbumId { index }, err))?;
            store
                .create(NewEntity::Album {
                    id: &album_id,
                    singer_id: &singer_id,
                    spec: album,
                })
                .map_err(|err| GraphError::at(GraphStep::InsertAlbum { index }, err))?;

            let track_count = resolve_track_count(album.tracks, rng);
            let mut track_ids = Vec::with_capacity(track_count as usize);
            for track_number in 1..=track_count {
                let track = synthesize_track(track_number, rng);
                let track_id = self.ids.generate().map_err(|err| {
                    GraphError::at(
                        GraphStep::TrackId {
                            album_index: index,
                            track_number,
                        },
                        err,
                    )
                })?;
                store
                    .create(NewEntity::Track {
                        id: &track_id,
                        album_id: &album_id,
                        spec: &track,
                    })
                    .map_err(|err| {
                        GraphError::at(
                            GraphStep::InsertTrack {
                                album_index: index,
                                track_number,
                            },
                            err,
                        )
                    })?;
                track_ids.push(track_id);
            }

            created_albums.push(CreatedAlbum {
                id: album_id,
                track_ids,
            });
        }

        Ok(CreatedGraph {
            singer_id,
            albums: created_albums,
        })
    }
}

fn validate_graph(singer: &SingerSpec, albums: &[AlbumSpec]) -> Result<(), GraphError> {
    singer
        .validate()
        .map_err(|error| GraphError::Validation {
            entity: EntityKind::Singer,
            position: None,
            error,
        })?;
    for (index, album) in albums.iter().enumerate() {
        album.validate().map_err(|error| GraphError::Validation {
            entity: EntityKind::Album,
            position: Some(index),
            error,
        })?;
    }
    Ok(())
}

/// Resolves a track count, drawing uniformly from `Between` ranges.
pub fn resolve_track_count<R: Rng + ?Sized>(count: TrackCount, rng: &mut R) -> u32 {
    match count {
        TrackCount::Exact(count) => count,
        TrackCount::Between { min, max } => rng.gen_range(min..=max),
    }
}

fn synthesize_track<R: Rng + ?Sized>(track_number: u32, rng: &mut R) -> TrackSpec {
    TrackSpec {
        track_number,
        title: format!("Track {track_number:02}"),
        duration_secs: rng.gen_range(MIN_TRACK_SECS..=MAX_TRACK_SECS),
    }
}
