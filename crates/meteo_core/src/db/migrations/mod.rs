//! Version-driven schema lifecycle.
//!
//! # Responsibility
//! - Create both tables on a fresh database.
//! - Drop and recreate both tables when the requested version is newer.
//!
//! # Invariants
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - DDL runs inside one transaction; a failure leaves the old schema intact.
//! - `location` is created before `weather`, and dropped after it.

use crate::contract::{LocationEntry, WeatherEntry};
use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Current schema version of the weather cache.
pub const DATABASE_VERSION: u32 = 2;

/// Outcome of [`apply_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    /// Fresh database; tables created.
    Created,
    /// Older schema dropped and recreated.
    Recreated { from: u32 },
    /// Schema already at the requested version.
    Unchanged,
}

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    DATABASE_VERSION
}

/// Brings the connection's schema to `target_version`.
///
/// # Errors
/// - `InvalidSchemaVersion` when `target_version` is 0.
/// - `UnsupportedSchemaVersion` when the database is newer than `target_version`.
pub fn apply_schema(conn: &mut Connection, target_version: u32) -> DbResult<SchemaAction> {
    if target_version == 0 {
        return Err(DbError::InvalidSchemaVersion(target_version));
    }

    let current_version = current_user_version(conn)?;
    if current_version > target_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: target_version,
        });
    }
    if current_version == target_version {
        return Ok(SchemaAction::Unchanged);
    }

    let tx = conn.transaction()?;
    let action = if current_version == 0 {
        SchemaAction::Created
    } else {
        tx.execute_batch(WeatherEntry::DROP_TABLE_SQL)?;
        tx.execute_batch(LocationEntry::DROP_TABLE_SQL)?;
        SchemaAction::Recreated {
            from: current_version,
        }
    };
    tx.execute_batch(LocationEntry::CREATE_TABLE_SQL)?;
    tx.execute_batch(WeatherEntry::CREATE_TABLE_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {target_version};"))?;
    tx.commit()?;

    info!(
        "event=schema_apply module=db status=ok from_version={} to_version={} action={:?}",
        current_version, target_version, action
    );
    Ok(action)
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
