//! SQLite storage bootstrap, schema lifecycle and store handles.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the weather cache.
//! - Create, recreate or keep the schema according to the store version.
//! - Share one store handle per database file within the process.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A version bump drops and recreates both tables; no data is migrated.
//! - No table is read or written before the schema step succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory, open_db_with_version};
pub use store::{delete_database, Store, StoreConnection, StoreLocation, StoreOptions};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Requested schema version is not a valid store version (must be >= 1).
    InvalidSchemaVersion(u32),
    /// A live handle for the same file was opened with another version.
    VersionConflict {
        path: PathBuf,
        open_version: u32,
        requested_version: u32,
    },
    /// The store file still has a live handle in this process.
    StoreInUse(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidSchemaVersion(version) => {
                write!(f, "schema version {version} is invalid; versions start at 1")
            }
            Self::VersionConflict {
                path,
                open_version,
                requested_version,
            } => write!(
                f,
                "store `{}` is already open at version {open_version}; requested {requested_version}",
                path.display()
            ),
            Self::StoreInUse(path) => {
                write!(f, "store `{}` still has live handles", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidSchemaVersion(_)
            | Self::VersionConflict { .. }
            | Self::StoreInUse(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
