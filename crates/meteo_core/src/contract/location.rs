//! `location` table contract.

use super::{base_content_uri, PATH_LOCATION};
use crate::path::ResourcePath;

/// Names, DDL and paths for the `location` table.
pub struct LocationEntry;

impl LocationEntry {
    pub const TABLE_NAME: &'static str = "location";

    /// External lookup key; unique across rows.
    pub const COLUMN_LOCATION_SETTING: &'static str = "location_setting";
    pub const COLUMN_CITY_NAME: &'static str = "city_name";
    pub const COLUMN_COORD_LAT: &'static str = "coord_lat";
    pub const COLUMN_COORD_LONG: &'static str = "coord_long";

    pub const CONTENT_TYPE: &'static str = "vnd.meteo.cursor.dir/com.mhv.meteoapp/location";
    pub const CONTENT_ITEM_TYPE: &'static str = "vnd.meteo.cursor.item/com.mhv.meteoapp/location";

    pub const CREATE_TABLE_SQL: &'static str = "CREATE TABLE location (
    _id INTEGER PRIMARY KEY,
    location_setting TEXT UNIQUE NOT NULL,
    city_name TEXT NOT NULL,
    coord_lat REAL NOT NULL,
    coord_long REAL NOT NULL
);";

    pub const DROP_TABLE_SQL: &'static str = "DROP TABLE IF EXISTS location;";

    /// `content://<authority>/location`
    pub fn content_uri() -> ResourcePath {
        base_content_uri().append_segment(PATH_LOCATION)
    }

    /// Identifies one inserted location row.
    pub fn build_location_uri(id: i64) -> ResourcePath {
        Self::content_uri().append_id(id)
    }
}
