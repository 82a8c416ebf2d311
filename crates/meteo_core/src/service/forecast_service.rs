//! Forecast ingestion and read use-cases.
//!
//! # Responsibility
//! - Give the sync layer idempotent entry points for locations and forecasts.
//! - Read forecasts back as typed records.
//!
//! # Invariants
//! - Service APIs go through the provider, so routing, date normalization and
//!   change notification are never bypassed.
//! - `add_location` never creates a second row for one location setting.

use crate::contract::{normalize_date, LocationEntry, WeatherEntry};
use crate::model::location::LocationRecord;
use crate::model::weather::WeatherRecord;
use crate::provider::{ProviderError, ProviderResult, WeatherProvider};
use log::debug;
use rusqlite::types::Value;
use std::sync::Arc;

const LOCATION_BY_SETTING_SELECTION: &str = "location_setting = ?";
const WEATHER_BEFORE_DAY_SELECTION: &str = "date < ?";
const WEATHER_PROJECTION: &[&str] = &["weather.*"];
const SORT_BY_DATE: &str = "weather.date ASC";

/// Use-case wrapper over a shared provider.
pub struct ForecastService {
    provider: Arc<WeatherProvider>,
}

impl ForecastService {
    pub fn new(provider: Arc<WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Returns the location row for `location_setting`, if cached.
    pub fn location(&self, location_setting: &str) -> ProviderResult<Option<LocationRecord>> {
        let mut cursor = self.provider.query(
            &LocationEntry::content_uri(),
            None,
            Some(LOCATION_BY_SETTING_SELECTION),
            &[Value::Text(location_setting.to_string())],
            None,
        )?;
        if !cursor.move_to_first() {
            return Ok(None);
        }
        Ok(Some(LocationRecord::from_cursor(&cursor)?))
    }

    /// Returns the row id for `location_setting`, inserting the location first
    /// when it is not cached yet.
    ///
    /// Safe to race: a caller that loses the insert to a concurrent one gets
    /// the winner's row id.
    pub fn add_location(
        &self,
        location_setting: &str,
        city_name: &str,
        coord_lat: f64,
        coord_long: f64,
    ) -> ProviderResult<i64> {
        if let Some(existing) = self.location(location_setting)? {
            if let Some(id) = existing.id {
                return Ok(id);
            }
        }

        let record = LocationRecord::new(location_setting, city_name, coord_lat, coord_long);
        let row_path = match self
            .provider
            .insert(&LocationEntry::content_uri(), &record.to_values())
        {
            Ok(row_path) => row_path,
            // Another caller inserted the same setting after our lookup.
            Err(err @ ProviderError::StorageFailure(_)) => {
                return match self.location(location_setting)? {
                    Some(LocationRecord { id: Some(id), .. }) => {
                        debug!(
                            "event=location_add module=service status=ok reused_after_conflict=true id={}",
                            id
                        );
                        Ok(id)
                    }
                    _ => Err(err),
                };
            }
            Err(err) => return Err(err),
        };
        row_path
            .segments()
            .last()
            .and_then(|segment| segment.parse::<i64>().ok())
            .ok_or_else(|| ProviderError::InsertFailed(row_path.to_string()))
    }

    /// Stores one batch of forecast days; returns rows written.
    pub fn store_forecast(&self, records: &[WeatherRecord]) -> ProviderResult<usize> {
        let rows: Vec<_> = records.iter().map(WeatherRecord::to_values).collect();
        self.provider
            .bulk_insert(&WeatherEntry::content_uri(), &rows)
    }

    /// Forecast days for `location_setting`, oldest first.
    ///
    /// `start_date` (any time of day) limits results to that day and later.
    pub fn forecast_for(
        &self,
        location_setting: &str,
        start_date: Option<i64>,
    ) -> ProviderResult<Vec<WeatherRecord>> {
        let path = match start_date {
            Some(start) => {
                WeatherEntry::build_weather_location_with_start_date(location_setting, start)
            }
            None => WeatherEntry::build_weather_location(location_setting),
        };

        let mut cursor =
            self.provider
                .query(&path, Some(WEATHER_PROJECTION), None, &[], Some(SORT_BY_DATE))?;
        let mut records = Vec::with_capacity(cursor.count());
        while cursor.move_to_next() {
            records.push(WeatherRecord::from_cursor(&cursor)?);
        }
        Ok(records)
    }

    /// Forecast for one exact day, if cached.
    ///
    /// # Errors
    /// - `InvalidArgument` for dates before 1970-01-01 UTC.
    pub fn forecast_on(
        &self,
        location_setting: &str,
        date: i64,
    ) -> ProviderResult<Option<WeatherRecord>> {
        let day = normalize_date(date)
            .filter(|day| *day >= 0)
            .ok_or_else(|| {
                ProviderError::InvalidArgument(format!(
                    "date {date} is not addressable; days before 1970 cannot be looked up"
                ))
            })?;
        let path = WeatherEntry::build_weather_location_with_date(location_setting, day);
        let mut cursor = self
            .provider
            .query(&path, Some(WEATHER_PROJECTION), None, &[], None)?;
        if !cursor.move_to_first() {
            return Ok(None);
        }
        Ok(Some(WeatherRecord::from_cursor(&cursor)?))
    }

    /// Deletes forecast days before the day containing `date`.
    pub fn purge_before(&self, date: i64) -> ProviderResult<usize> {
        let day = normalize_date(date).ok_or_else(|| {
            ProviderError::InvalidArgument(format!("date {date} is outside the supported range"))
        })?;
        self.provider.delete(
            &WeatherEntry::content_uri(),
            Some(WEATHER_BEFORE_DAY_SELECTION),
            &[Value::Integer(day)],
        )
    }
}
