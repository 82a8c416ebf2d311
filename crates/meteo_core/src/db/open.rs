//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Apply the schema step before returning a writable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Writable connections have the requested schema version applied.
//! - File-backed databases run in WAL mode so readers do not block the writer.

use super::migrations::{apply_schema, DATABASE_VERSION};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a database file at the current schema version.
///
/// # Side effects
/// - Creates the file (and missing parent directories) when absent.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_version(path, DATABASE_VERSION)
}

/// Opens a database file and brings its schema to `version`.
pub fn open_db_with_version(path: impl AsRef<Path>, version: u32) -> DbResult<Connection> {
    open_file_writer(path.as_ref(), version, DEFAULT_BUSY_TIMEOUT)
}

/// Opens an in-memory database at the current schema version.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_memory(DATABASE_VERSION, DEFAULT_BUSY_TIMEOUT)
}

pub(crate) fn open_file_writer(
    path: &Path,
    version: u32,
    busy_timeout: Duration,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(path);
    finish_open(conn, "file", started_at, |conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        bootstrap_connection(conn, version, busy_timeout)
    })
}

pub(crate) fn open_memory(version: u32, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let conn = Connection::open_in_memory();
    finish_open(conn, "memory", started_at, |conn| {
        bootstrap_connection(conn, version, busy_timeout)
    })
}

/// Opens a read-only connection to an already bootstrapped database file.
pub(crate) fn open_file_reader(path: &Path, busy_timeout: Duration) -> DbResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

fn finish_open(
    conn: rusqlite::Result<Connection>,
    mode: &str,
    started_at: Instant,
    bootstrap: impl FnOnce(&mut Connection) -> DbResult<()>,
) -> DbResult<Connection> {
    let mut conn = match conn {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    version: u32,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_schema(conn, version)?;
    Ok(())
}
