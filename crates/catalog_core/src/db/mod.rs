//! SQLite storage bootstrap, schema migrations and the shared store handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the catalog core.
//! - Apply schema migrations in deterministic order.
//! - Hand out pooled, migrated connections process-wide through `CatalogDb`.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write catalog data before migrations succeed.
//! - A `CatalogDb` only ever wraps a pool over a fully migrated database.
//! - File databases run in WAL mode so readers never wait on writers.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod connect;
pub mod migrations;
mod open;

pub use connect::{retry_with_backoff, ConnectionError, ConnectionManager, RetryPolicy};
pub use open::{open_db, open_db_in_memory, open_pool};

pub type DbResult<T> = Result<T, DbError>;
pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// The pool could not be built or no connection was handed out in time.
    Pool(r2d2::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::Pool(err) => write!(f, "connection pool: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(value: r2d2::Error) -> Self {
        Self::Pool(value)
    }
}

const REQUIRED_TABLES: [&str; 3] = ["singers", "albums", "tracks"];

/// Process-wide handle to the pooled catalog database.
///
/// Cloning is cheap; all clones share one pool.
#[derive(Clone)]
pub struct CatalogDb {
    pool: SqlitePool,
}

impl CatalogDb {
    /// Opens `connection_string` behind a pool of at most `pool_size` connections.
    ///
    /// `:memory:` databases are private to one connection, so their pool holds exactly one.
    pub fn open(connection_string: &str, pool_size: u32) -> DbResult<Self> {
        Self::try_new(open_pool(connection_string, pool_size)?)
    }

    /// Opens a private in-memory catalog with migrations applied.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(":memory:", 1)
    }

    /// Wraps a pool after checking its database carries the current schema.
    pub fn try_new(pool: SqlitePool) -> DbResult<Self> {
        {
            let conn = pool.get()?;
            ensure_connection_ready(&conn)?;
        }
        Ok(Self { pool })
    }

    pub fn pool_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Checks out one connection for one unit of work.
    pub fn conn(&self) -> DbResult<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// Runs `f` against a plain (non-transactional) session.
    pub fn with_session<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.conn()?;
        f(&conn)
    }
}

fn ensure_connection_ready(conn: &Connection) -> DbResult<()> {
    let expected_version = migrations::latest_version();
    let actual_version = migrations::current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(DbError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
