//! Typed records for the two cached tables.
//!
//! # Responsibility
//! - Give callers typed rows instead of raw column/value maps.
//! - Convert records to write values and back from cursor rows.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one.
//! - Conversion to write values never includes `_id`.

pub mod location;
pub mod weather;
