//! Repository layer over the weather cache tables.
//!
//! # Responsibility
//! - Turn table-level read/write requests into SQL statements.
//! - Isolate SQLite details from route resolution and notification.
//!
//! # Invariants
//! - Repositories only run against connections whose schema is applied.
//! - Repository APIs surface identifier problems separately from DB errors.

pub mod table_repo;
