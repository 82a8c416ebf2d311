//! Storage contract shared by the router, the store and callers.
//!
//! # Responsibility
//! - Name the authority, tables and columns every layer agrees on.
//! - Own table DDL and canonical resource path builders/extractors.
//! - Define the day-boundary date normalization rule.
//!
//! # Invariants
//! - Every stored or filtered weather date is the UTC start of its day.
//! - `location` DDL must run before `weather` DDL (foreign key target).

use crate::path::ResourcePath;
use time::{OffsetDateTime, Time};

pub mod location;
pub mod weather;

pub use location::LocationEntry;
pub use weather::WeatherEntry;

/// Authority every resource path of this crate is addressed under.
pub const CONTENT_AUTHORITY: &str = "com.mhv.meteoapp";
/// Table-level path segment for weather rows.
pub const PATH_WEATHER: &str = "weather";
/// Table-level path segment for location rows.
pub const PATH_LOCATION: &str = "location";
/// Conventional file name for the on-disk store.
pub const DATABASE_NAME: &str = "meteo.db";
/// Store-assigned row identity column shared by both tables.
pub const COLUMN_ID: &str = "_id";

/// Logical tables reachable through resource paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Weather,
    Location,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Weather => WeatherEntry::TABLE_NAME,
            Self::Location => LocationEntry::TABLE_NAME,
        }
    }

    /// Looks a table up by its SQL name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            WeatherEntry::TABLE_NAME => Some(Self::Weather),
            LocationEntry::TABLE_NAME => Some(Self::Location),
            _ => None,
        }
    }

    /// Table-level resource path.
    pub fn content_uri(self) -> ResourcePath {
        match self {
            Self::Weather => WeatherEntry::content_uri(),
            Self::Location => LocationEntry::content_uri(),
        }
    }
}

/// Root path for the crate authority.
pub fn base_content_uri() -> ResourcePath {
    ResourcePath::new(CONTENT_AUTHORITY)
}

/// Canonical resource path for row `id` of `table`.
pub fn build_row_uri(table: Table, id: i64) -> ResourcePath {
    table.content_uri().append_id(id)
}

/// Reduces epoch seconds to the start of the same UTC calendar day.
///
/// Returns `None` when the value is outside the supported calendar range.
pub fn normalize_date(epoch_seconds: i64) -> Option<i64> {
    let moment = OffsetDateTime::from_unix_timestamp(epoch_seconds).ok()?;
    Some(moment.replace_time(Time::MIDNIGHT).unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::{build_row_uri, normalize_date, Table};

    const APRIL_3_2016: i64 = 1_459_641_600;

    #[test]
    fn normalize_date_strips_time_of_day() {
        assert_eq!(normalize_date(APRIL_3_2016), Some(APRIL_3_2016));
        assert_eq!(normalize_date(APRIL_3_2016 + 13 * 3600 + 59), Some(APRIL_3_2016));
        assert_eq!(normalize_date(APRIL_3_2016 + 86_399), Some(APRIL_3_2016));
        assert_eq!(normalize_date(APRIL_3_2016 + 86_400), Some(APRIL_3_2016 + 86_400));
    }

    #[test]
    fn normalize_date_handles_pre_epoch_values() {
        assert_eq!(normalize_date(-1), Some(-86_400));
    }

    #[test]
    fn normalize_date_rejects_out_of_range_values() {
        assert_eq!(normalize_date(i64::MAX), None);
    }

    #[test]
    fn table_names_round_trip() {
        for table in [Table::Weather, Table::Location] {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("forecast"), None);
    }

    #[test]
    fn row_uri_appends_id_to_table_path() {
        assert_eq!(
            build_row_uri(Table::Location, 7).to_string(),
            "content://com.mhv.meteoapp/location/7"
        );
    }
}
