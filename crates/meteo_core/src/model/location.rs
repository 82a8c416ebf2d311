//! Location record.

use crate::contract::{LocationEntry, COLUMN_ID};
use crate::cursor::{Cursor, CursorError};
use crate::values::ContentValues;
use serde::{Deserialize, Serialize};

/// One row of the `location` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: Option<i64>,
    /// External lookup key (postal code or query string).
    pub location_setting: String,
    pub city_name: String,
    pub coord_lat: f64,
    pub coord_long: f64,
}

impl LocationRecord {
    pub fn new(
        location_setting: impl Into<String>,
        city_name: impl Into<String>,
        coord_lat: f64,
        coord_long: f64,
    ) -> Self {
        Self {
            id: None,
            location_setting: location_setting.into(),
            city_name: city_name.into(),
            coord_lat,
            coord_long,
        }
    }

    pub fn to_values(&self) -> ContentValues {
        ContentValues::new()
            .with(
                LocationEntry::COLUMN_LOCATION_SETTING,
                self.location_setting.clone(),
            )
            .with(LocationEntry::COLUMN_CITY_NAME, self.city_name.clone())
            .with(LocationEntry::COLUMN_COORD_LAT, self.coord_lat)
            .with(LocationEntry::COLUMN_COORD_LONG, self.coord_long)
    }

    /// Reads the cursor's current row.
    pub fn from_cursor(cursor: &Cursor) -> Result<Self, CursorError> {
        Ok(Self {
            id: Some(cursor.get_i64(COLUMN_ID)?),
            location_setting: cursor.get_string(LocationEntry::COLUMN_LOCATION_SETTING)?,
            city_name: cursor.get_string(LocationEntry::COLUMN_CITY_NAME)?,
            coord_lat: cursor.get_f64(LocationEntry::COLUMN_COORD_LAT)?,
            coord_long: cursor.get_f64(LocationEntry::COLUMN_COORD_LONG)?,
        })
    }
}
