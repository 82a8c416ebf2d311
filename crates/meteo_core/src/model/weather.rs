//! Weather record.

use crate::contract::{WeatherEntry, COLUMN_ID};
use crate::cursor::{Cursor, CursorError};
use crate::values::ContentValues;
use serde::{Deserialize, Serialize};

/// One forecast day for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: Option<i64>,
    /// `location._id` this forecast belongs to.
    pub location_id: i64,
    /// Epoch seconds; normalized to the UTC day start when stored.
    pub date: i64,
    pub short_desc: String,
    pub weather_id: i64,
    pub min_temp: f64,
    pub max_temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    /// Wind direction in degrees.
    pub degrees: f64,
}

impl WeatherRecord {
    pub fn to_values(&self) -> ContentValues {
        ContentValues::new()
            .with(WeatherEntry::COLUMN_LOC_KEY, self.location_id)
            .with(WeatherEntry::COLUMN_DATE, self.date)
            .with(WeatherEntry::COLUMN_SHORT_DESC, self.short_desc.clone())
            .with(WeatherEntry::COLUMN_WEATHER_ID, self.weather_id)
            .with(WeatherEntry::COLUMN_MIN_TEMP, self.min_temp)
            .with(WeatherEntry::COLUMN_MAX_TEMP, self.max_temp)
            .with(WeatherEntry::COLUMN_HUMIDITY, self.humidity)
            .with(WeatherEntry::COLUMN_PRESSURE, self.pressure)
            .with(WeatherEntry::COLUMN_WIND_SPEED, self.wind_speed)
            .with(WeatherEntry::COLUMN_DEGREES, self.degrees)
    }

    /// Reads the cursor's current row.
    ///
    /// On join results the first `_id` column (the weather row) is used.
    pub fn from_cursor(cursor: &Cursor) -> Result<Self, CursorError> {
        Ok(Self {
            id: Some(cursor.get_i64(COLUMN_ID)?),
            location_id: cursor.get_i64(WeatherEntry::COLUMN_LOC_KEY)?,
            date: cursor.get_i64(WeatherEntry::COLUMN_DATE)?,
            short_desc: cursor.get_string(WeatherEntry::COLUMN_SHORT_DESC)?,
            weather_id: cursor.get_i64(WeatherEntry::COLUMN_WEATHER_ID)?,
            min_temp: cursor.get_f64(WeatherEntry::COLUMN_MIN_TEMP)?,
            max_temp: cursor.get_f64(WeatherEntry::COLUMN_MAX_TEMP)?,
            humidity: cursor.get_f64(WeatherEntry::COLUMN_HUMIDITY)?,
            pressure: cursor.get_f64(WeatherEntry::COLUMN_PRESSURE)?,
            wind_speed: cursor.get_f64(WeatherEntry::COLUMN_WIND_SPEED)?,
            degrees: cursor.get_f64(WeatherEntry::COLUMN_DEGREES)?,
        })
    }
}
