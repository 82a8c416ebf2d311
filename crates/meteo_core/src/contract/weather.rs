//! `weather` table contract.
//!
//! # Invariants
//! - `(date, location_id)` is unique; a conflicting insert replaces the old row.
//! - Path builders emit normalized dates whenever the value is in range.

use super::{base_content_uri, normalize_date, PATH_WEATHER};
use crate::path::ResourcePath;

/// Names, DDL and paths for the `weather` table.
pub struct WeatherEntry;

impl WeatherEntry {
    pub const TABLE_NAME: &'static str = "weather";

    /// Foreign key into `location._id`.
    pub const COLUMN_LOC_KEY: &'static str = "location_id";
    /// Epoch seconds at the UTC start of the forecast day.
    pub const COLUMN_DATE: &'static str = "date";
    pub const COLUMN_SHORT_DESC: &'static str = "short_desc";
    /// Provider condition code, used to pick an icon.
    pub const COLUMN_WEATHER_ID: &'static str = "weather_id";
    pub const COLUMN_MIN_TEMP: &'static str = "min";
    pub const COLUMN_MAX_TEMP: &'static str = "max";
    pub const COLUMN_HUMIDITY: &'static str = "humidity";
    pub const COLUMN_PRESSURE: &'static str = "pressure";
    pub const COLUMN_WIND_SPEED: &'static str = "wind";
    /// Wind direction in meteorological degrees.
    pub const COLUMN_DEGREES: &'static str = "degrees";

    /// Query parameter carrying the lower date bound of a range query.
    pub const QUERY_START_DATE: &'static str = "startDate";

    pub const CONTENT_TYPE: &'static str = "vnd.meteo.cursor.dir/com.mhv.meteoapp/weather";
    pub const CONTENT_ITEM_TYPE: &'static str = "vnd.meteo.cursor.item/com.mhv.meteoapp/weather";

    pub const CREATE_TABLE_SQL: &'static str = "CREATE TABLE weather (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL,
    date INTEGER NOT NULL,
    short_desc TEXT NOT NULL,
    weather_id INTEGER NOT NULL,
    min REAL NOT NULL,
    max REAL NOT NULL,
    humidity REAL NOT NULL,
    pressure REAL NOT NULL,
    wind REAL NOT NULL,
    degrees REAL NOT NULL,
    FOREIGN KEY (location_id) REFERENCES location (_id),
    UNIQUE (date, location_id) ON CONFLICT REPLACE
);";

    pub const DROP_TABLE_SQL: &'static str = "DROP TABLE IF EXISTS weather;";

    /// `content://<authority>/weather`
    pub fn content_uri() -> ResourcePath {
        base_content_uri().append_segment(PATH_WEATHER)
    }

    /// Identifies one inserted weather row.
    pub fn build_weather_uri(id: i64) -> ResourcePath {
        Self::content_uri().append_id(id)
    }

    /// `weather/<location_setting>`
    pub fn build_weather_location(location_setting: &str) -> ResourcePath {
        Self::content_uri().append_segment(location_setting)
    }

    /// `weather/<location_setting>?startDate=<normalized start>`
    pub fn build_weather_location_with_start_date(
        location_setting: &str,
        start_date: i64,
    ) -> ResourcePath {
        let normalized = normalize_date(start_date).unwrap_or(start_date);
        Self::build_weather_location(location_setting)
            .with_query_parameter(Self::QUERY_START_DATE, normalized.to_string())
    }

    /// `weather/<location_setting>/<normalized date>`
    ///
    /// Only days from 1970-01-01 UTC on are addressable; an earlier date
    /// yields a negative segment that no route matches.
    pub fn build_weather_location_with_date(location_setting: &str, date: i64) -> ResourcePath {
        let normalized = normalize_date(date).unwrap_or(date);
        Self::build_weather_location(location_setting).append_id(normalized)
    }

    pub fn location_setting_from_uri(path: &ResourcePath) -> Option<&str> {
        path.segment(1)
    }

    /// Date segment of a `weather/<setting>/<date>` path.
    pub fn date_from_uri(path: &ResourcePath) -> Option<i64> {
        path.segment(2)?.parse().ok()
    }

    /// Start-date query parameter; `0` (no lower bound) when absent or unparsable.
    pub fn start_date_from_uri(path: &ResourcePath) -> i64 {
        path.query_parameter(Self::QUERY_START_DATE)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::WeatherEntry;

    const TEST_DATE: i64 = 1_459_641_600;

    #[test]
    fn builders_and_extractors_agree() {
        let path = WeatherEntry::build_weather_location_with_date("London, UK", TEST_DATE + 3600);

        assert_eq!(
            WeatherEntry::location_setting_from_uri(&path),
            Some("London, UK")
        );
        assert_eq!(WeatherEntry::date_from_uri(&path), Some(TEST_DATE));
        assert_eq!(WeatherEntry::start_date_from_uri(&path), 0);
    }

    #[test]
    fn start_date_is_read_from_query() {
        let path = WeatherEntry::build_weather_location_with_start_date("94043", TEST_DATE + 60);

        assert_eq!(WeatherEntry::start_date_from_uri(&path), TEST_DATE);
        assert_eq!(WeatherEntry::date_from_uri(&path), None);
    }
}
