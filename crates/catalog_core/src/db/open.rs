//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open connections and pools from a connection string (path, `file:` URI or `:memory:`).
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections (pooled or not) have `foreign_keys=ON` and a busy timeout.
//! - Returned connections have migrations fully applied.
//! - Plain file databases are switched to `journal_mode=WAL`.

use super::migrations::apply_migrations;
use super::{DbResult, SqlitePool};
use log::{error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

const MEMORY_CONNECTION_STRING: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
enum OpenMode {
    File,
    Uri,
    Memory,
}

impl OpenMode {
    fn detect(connection_string: &str) -> Self {
        if connection_string == MEMORY_CONNECTION_STRING {
            Self::Memory
        } else if connection_string.starts_with("file:") {
            Self::Uri
        } else {
            Self::File
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Uri => "uri",
            Self::Memory => "memory",
        }
    }
}

/// Opens the database named by `connection_string` and applies pending migrations.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(connection_string: &str) -> DbResult<Connection> {
    let mode = OpenMode::detect(connection_string.trim());
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={}",
        mode.as_str()
    );

    let opened = match mode {
        OpenMode::Memory => Connection::open_in_memory(),
        OpenMode::Uri => Connection::open_with_flags(
            connection_string.trim(),
            OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI,
        ),
        OpenMode::File => Connection::open(connection_string.trim()),
    };

    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, mode) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode.as_str(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db(MEMORY_CONNECTION_STRING)
}

/// Builds a connection pool over `connection_string` with pending migrations applied.
///
/// `pool_size` below 1 is treated as 1. `:memory:` pools always hold a single
/// connection, which owns the private database for the pool's lifetime.
pub fn open_pool(connection_string: &str, pool_size: u32) -> DbResult<SqlitePool> {
    let target = connection_string.trim();
    let mode = OpenMode::detect(target);

    // Migrates through a fast-failing single connection, which also keeps a
    // shared-cache URI database alive until the pool owns its connections.
    let bootstrap = match mode {
        OpenMode::Memory => None,
        OpenMode::File | OpenMode::Uri => Some(open_db(target)?),
    };

    let manager = match mode {
        OpenMode::Memory => SqliteConnectionManager::memory(),
        OpenMode::Uri => SqliteConnectionManager::file(target)
            .with_flags(OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI),
        OpenMode::File => SqliteConnectionManager::file(target),
    }
    .with_init(configure_session);

    let builder = match mode {
        OpenMode::Memory => Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None),
        OpenMode::File | OpenMode::Uri => Pool::builder().max_size(pool_size.max(1)),
    };
    let pool = builder.build(manager)?;

    if bootstrap.is_none() {
        let mut conn = pool.get()?;
        apply_migrations(&mut conn)?;
    }
    drop(bootstrap);

    info!(
        "event=db_pool module=db status=ok mode={} max_size={}",
        mode.as_str(),
        pool.max_size()
    );
    Ok(pool)
}

fn configure_session(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

fn bootstrap_connection(conn: &mut Connection, mode: OpenMode) -> DbResult<()> {
    configure_session(conn)?;
    if matches!(mode, OpenMode::File) {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    }
    apply_migrations(conn)?;
    Ok(())
}
