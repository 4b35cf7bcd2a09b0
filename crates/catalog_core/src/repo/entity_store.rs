//! Entity store contract and SQLite implementation.
//!
//! # Responsibility
//! - Insert single catalog rows with caller-assigned identifiers.
//! - Query rows by enumerated predicates, optionally hydrating child collections.
//!
//! # Invariants
//! - The store never assigns identifiers; `NewEntity` always carries one.
//! - Write paths validate their spec before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Works unchanged on a plain connection or inside a `Transaction`.

use crate::db::DbError;
use crate::model::catalog::{
    format_date, parse_date, Album, AlbumSpec, Singer, SingerSpec, Track, TrackSpec,
    ValidationError,
};
use crate::model::entity::{EntityId, EntityKind, EntityMeta};
use crate::repo::query::{AlbumPredicate, SingerPredicate};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SINGER_SELECT_SQL: &str = "SELECT
    s.id AS id,
    s.first_name AS first_name,
    s.last_name AS last_name,
    s.birth_date AS birth_date,
    s.created_at AS created_at,
    s.updated_at AS updated_at
FROM singers s";

const ALBUM_SELECT_SQL: &str = "SELECT
    a.id AS id,
    a.singer_id AS singer_id,
    a.title AS title,
    a.release_date AS release_date,
    a.created_at AS created_at,
    a.updated_at AS updated_at
FROM albums a";

const TRACK_SELECT_SQL: &str = "SELECT
    id,
    album_id,
    track_number,
    title,
    duration_secs,
    created_at,
    updated_at
FROM tracks";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure for single-row writes and queries.
#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    Db(DbError),
    /// Primary key, foreign key, uniqueness or check constraint rejected a write.
    Constraint { kind: EntityKind, message: String },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint { kind, message } => {
                write!(f, "{kind} write violated a constraint: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Constraint { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One row to insert, with its identifier and owner already assigned.
#[derive(Debug, Clone, Copy)]
pub enum NewEntity<'a> {
    Singer {
        id: &'a EntityId,
        spec: &'a SingerSpec,
    },
    Album {
        id: &'a EntityId,
        singer_id: &'a EntityId,
        spec: &'a AlbumSpec,
    },
    Track {
        id: &'a EntityId,
        album_id: &'a EntityId,
        spec: &'a TrackSpec,
    },
}

impl NewEntity<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Singer { .. } => EntityKind::Singer,
            Self::Album { .. } => EntityKind::Album,
            Self::Track { .. } => EntityKind::Track,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Singer { id, .. } | Self::Album { id, .. } | Self::Track { id, .. } => id,
        }
    }
}

/// Low-level create/query primitives over catalog tables.
pub trait EntityStore {
    /// Inserts one row and returns its (caller-assigned) id.
    fn create(&self, entity: NewEntity<'_>) -> StoreResult<EntityId>;
    /// Singers matching `predicate`; with `hydrate`, albums and tracks are attached.
    fn find_singers(&self, predicate: &SingerPredicate, hydrate: bool) -> StoreResult<Vec<Singer>>;
    /// Albums matching `predicate`; with `hydrate`, tracks are attached.
    fn find_albums(&self, predicate: &AlbumPredicate, hydrate: bool) -> StoreResult<Vec<Album>>;
    /// Tracks of one album ordered by track number.
    fn find_tracks(&self, album_id: &EntityId) -> StoreResult<Vec<Track>>;
}

/// SQLite-backed entity store borrowing a connection or transaction.
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EntityStore for SqliteEntityStore<'_> {
    fn create(&self, entity: NewEntity<'_>) -> StoreResult<EntityId> {
        let kind = entity.kind();
        let result = match entity {
            NewEntity::Singer { id, spec } => {
                spec.validate()?;
                self.conn.execute(
                    "INSERT INTO singers (id, first_name, last_name, birth_date)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![
                        id.as_str(),
                        spec.first_name.trim(),
                        spec.last_name.trim(),
                        spec.birth_date.map(format_date),
                    ],
                )
            }
            NewEntity::Album {
                id,
                singer_id,
                spec,
            } => {
                spec.validate()?;
                self.conn.execute(
                    "INSERT INTO albums (id, singer_id, title, release_date)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![
                        id.as_str(),
                        singer_id.as_str(),
                        spec.title.trim(),
                        spec.release_date.map(format_date),
                    ],
                )
            }
            NewEntity::Track { id, album_id, spec } => {
                spec.validate()?;
                self.conn.execute(
                    "INSERT INTO tracks (id, album_id, track_number, title, duration_secs)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        id.as_str(),
                        album_id.as_str(),
                        spec.track_number,
                        spec.title.trim(),
                        spec.duration_secs,
                    ],
                )
            }
        };

        result.map_err(|err| map_write_error(kind, err))?;
        Ok(entity.id().clone())
    }

    fn find_singers(&self, predicate: &SingerPredicate, hydrate: bool) -> StoreResult<Vec<Singer>> {
        let mut bind_values: Vec<Value> = Vec::new();
        let sql = match predicate {
            SingerPredicate::IdEquals(id) => {
                bind_values.push(Value::Text(id.as_str().to_string()));
                format!("{SINGER_SELECT_SQL} WHERE s.id = ?1 ORDER BY s.rowid ASC")
            }
            SingerPredicate::LastNameEquals(last_name) => {
                bind_values.push(Value::Text(last_name.clone()));
                format!("{SINGER_SELECT_SQL} WHERE s.last_name = ?1 ORDER BY s.rowid ASC")
            }
            SingerPredicate::LastNamePrefix(prefix) => {
                bind_values.push(Value::Text(prefix.clone()));
                format!(
                    "{SINGER_SELECT_SQL}
                     WHERE substr(s.last_name, 1, length(?1)) = ?1
                     ORDER BY s.rowid ASC"
                )
            }
            SingerPredicate::ReleasedAlbumBefore(date) => {
                bind_values.push(Value::Text(format_date(*date)));
                format!(
                    "{SINGER_SELECT_SQL}
                     INNER JOIN (
                        SELECT singer_id, MIN(release_date) AS first_release
                        FROM albums
                        WHERE release_date IS NOT NULL
                          AND release_date < ?1
                        GROUP BY singer_id
                     ) r ON r.singer_id = s.id
                     ORDER BY r.first_release ASC, s.rowid ASC"
                )
            }
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut singers = Vec::new();
        while let Some(row) = rows.next()? {
            singers.push(parse_singer_row(row)?);
        }

        if hydrate {
            for singer in &mut singers {
                singer.albums = self.find_albums(
                    &AlbumPredicate::SingerIdEquals(singer.meta.id.clone()),
                    true,
                )?;
            }
        }

        Ok(singers)
    }

    fn find_albums(&self, predicate: &AlbumPredicate, hydrate: bool) -> StoreResult<Vec<Album>> {
        let mut bind_values: Vec<Value> = Vec::new();
        let sql = match predicate {
            AlbumPredicate::IdEquals(id) => {
                bind_values.push(Value::Text(id.as_str().to_string()));
                format!("{ALBUM_SELECT_SQL} WHERE a.id = ?1 ORDER BY a.rowid ASC")
            }
            AlbumPredicate::SingerIdEquals(singer_id) => {
                bind_values.push(Value::Text(singer_id.as_str().to_string()));
                format!("{ALBUM_SELECT_SQL} WHERE a.singer_id = ?1 ORDER BY a.rowid ASC")
            }
            AlbumPredicate::TitlePrefix(prefix) => {
                bind_values.push(Value::Text(prefix.clone()));
                format!(
                    "{ALBUM_SELECT_SQL}
                     WHERE substr(a.title, 1, length(?1)) = ?1
                     ORDER BY a.rowid ASC"
                )
            }
            AlbumPredicate::ReleasedBefore(date) => {
                bind_values.push(Value::Text(format_date(*date)));
                format!(
                    "{ALBUM_SELECT_SQL}
                     WHERE a.release_date IS NOT NULL
                       AND a.release_date < ?1
                     ORDER BY a.release_date ASC, a.rowid ASC"
                )
            }
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut albums = Vec::new();
        while let Some(row) = rows.next()? {
            albums.push(parse_album_row(row)?);
        }

        if hydrate {
            for album in &mut albums {
                album.tracks = self.find_tracks(&album.meta.id)?;
            }
        }

        Ok(albums)
    }

    fn find_tracks(&self, album_id: &EntityId) -> StoreResult<Vec<Track>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TRACK_SELECT_SQL}
             WHERE album_id = ?1
             ORDER BY track_number ASC;"
        ))?;
        let mut rows = stmt.query([album_id.as_str()])?;
        let mut tracks = Vec::new();
        while let Some(row) = rows.next()? {
            tracks.push(parse_track_row(row)?);
        }
        Ok(tracks)
    }
}

fn map_write_error(kind: EntityKind, err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Constraint {
                kind,
                message: message.clone().unwrap_or_else(|| failure.to_string()),
            }
        }
        _ => err.into(),
    }
}

fn parse_meta(row: &Row<'_>) -> StoreResult<EntityMeta> {
    let id: String = row.get("id")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    if updated_at < created_at {
        return Err(StoreError::InvalidData(format!(
            "updated_at {updated_at} precedes created_at {created_at} for `{id}`"
        )));
    }
    Ok(EntityMeta {
        id: EntityId::from_existing(id),
        created_at,
        updated_at,
    })
}

fn parse_singer_row(row: &Row<'_>) -> StoreResult<Singer> {
    Ok(Singer {
        meta: parse_meta(row)?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        birth_date: parse_stored_date(row, "singers", "birth_date")?,
        albums: Vec::new(),
    })
}

fn parse_album_row(row: &Row<'_>) -> StoreResult<Album> {
    let singer_id: String = row.get("singer_id")?;
    Ok(Album {
        meta: parse_meta(row)?,
        singer_id: EntityId::from_existing(singer_id),
        title: row.get("title")?,
        release_date: parse_stored_date(row, "albums", "release_date")?,
        tracks: Vec::new(),
    })
}

fn parse_track_row(row: &Row<'_>) -> StoreResult<Track> {
    let album_id: String = row.get("album_id")?;
    Ok(Track {
        meta: parse_meta(row)?,
        album_id: EntityId::from_existing(album_id),
        track_number: parse_stored_u32(row, "track_number")?,
        title: row.get("title")?,
        duration_secs: parse_stored_u32(row, "duration_secs")?,
    })
}

fn parse_stored_date(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> StoreResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => parse_date(column, &text).map(Some).map_err(|_| {
            StoreError::InvalidData(format!("invalid date `{text}` in {table}.{column}"))
        }),
        None => Ok(None),
    }
}

fn parse_stored_u32(row: &Row<'_>, column: &str) -> StoreResult<u32> {
    let value: i64 = row.get(column)?;
    u32::try_from(value).map_err(|_| {
        StoreError::InvalidData(format!("out-of-range value `{value}` in tracks.{column}"))
    })
}
