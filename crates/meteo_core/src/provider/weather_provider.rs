//! Weather/location provider.
//!
//! # Responsibility
//! - Resolve resource paths and run the matching table or join statement.
//! - Normalize weather dates before they are stored.
//! - Run bulk inserts in one IMMEDIATE transaction.
//!
//! # Invariants
//! - Connection guards are released before observers are notified.
//! - Insert always notifies on success; update/delete/bulk insert notify only
//!   when at least one row was affected.
//! - Notifications target the path the caller addressed, once per call.

use crate::contract::{build_row_uri, normalize_date, LocationEntry, Table, WeatherEntry};
use crate::cursor::{Cursor, CursorWatch};
use crate::db::Store;
use crate::notify::ChangeNotifier;
use crate::path::ResourcePath;
use crate::provider::{ProviderError, ProviderResult};
use crate::repo::table_repo::{SelectSpec, SqliteTableRepository, TableRepository};
use crate::router::{ResolvedRoute, Route, RouteMatcher};
use crate::values::ContentValues;
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::Arc;
use std::time::Instant;

/// weather INNER JOIN location ON weather.location_id = location._id
const WEATHER_LOCATION_JOIN: &str =
    "weather INNER JOIN location ON weather.location_id = location._id";
const LOCATION_SETTING_SELECTION: &str = "location.location_setting = ?";
const LOCATION_SETTING_WITH_START_DATE_SELECTION: &str =
    "location.location_setting = ? AND weather.date >= ?";
const LOCATION_SETTING_AND_DAY_SELECTION: &str =
    "location.location_setting = ? AND weather.date = ?";

/// Resource-addressed CRUD entry point over one store.
pub struct WeatherProvider {
    store: Arc<Store>,
    notifier: ChangeNotifier,
    matcher: RouteMatcher,
}

impl WeatherProvider {
    /// Creates a provider with the standard route table.
    pub fn new(store: Arc<Store>, notifier: ChangeNotifier) -> Self {
        Self::with_matcher(store, notifier, RouteMatcher::standard())
    }

    pub fn with_matcher(store: Arc<Store>, notifier: ChangeNotifier, matcher: RouteMatcher) -> Self {
        Self {
            store,
            notifier,
            matcher,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Content type of the rows `path` addresses.
    pub fn get_type(&self, path: &ResourcePath) -> ProviderResult<&'static str> {
        let content_type = match self.resolve(path)?.route() {
            Route::Weather | Route::WeatherByLocation => WeatherEntry::CONTENT_TYPE,
            Route::WeatherByLocationAndDate => WeatherEntry::CONTENT_ITEM_TYPE,
            Route::Location => LocationEntry::CONTENT_TYPE,
        };
        Ok(content_type)
    }

    /// Runs the read addressed by `path`.
    ///
    /// Table routes use the caller's `selection`/`args` as-is. Join routes
    /// apply their own location/date filter first; a caller selection is ANDed
    /// after it and its `args` follow the route arguments.
    pub fn query(
        &self,
        path: &ResourcePath,
        projection: Option<&[&str]>,
        selection: Option<&str>,
        args: &[Value],
        sort_order: Option<&str>,
    ) -> ProviderResult<Cursor> {
        let started_at = Instant::now();
        let resolved = self.resolve(path)?;

        let (from, route_selection, route_args): (&str, Option<&str>, Vec<Value>) =
            match &resolved {
                ResolvedRoute::Weather => (WeatherEntry::TABLE_NAME, None, Vec::new()),
                ResolvedRoute::Location => (LocationEntry::TABLE_NAME, None, Vec::new()),
                ResolvedRoute::WeatherByLocation {
                    location_setting,
                    start_date: None,
                } => (
                    WEATHER_LOCATION_JOIN,
                    Some(LOCATION_SETTING_SELECTION),
                    vec![Value::Text(location_setting.clone())],
                ),
                ResolvedRoute::WeatherByLocation {
                    location_setting,
                    start_date: Some(start_date),
                } => (
                    WEATHER_LOCATION_JOIN,
                    Some(LOCATION_SETTING_WITH_START_DATE_SELECTION),
                    vec![
                        Value::Text(location_setting.clone()),
                        Value::Integer(*start_date),
                    ],
                ),
                ResolvedRoute::WeatherByLocationAndDate {
                    location_setting,
                    date,
                } => (
                    WEATHER_LOCATION_JOIN,
                    Some(LOCATION_SETTING_AND_DAY_SELECTION),
                    vec![Value::Text(location_setting.clone()), Value::Integer(*date)],
                ),
            };

        let caller_selection = selection.map(str::trim).filter(|value| !value.is_empty());
        let (selection, args) = match (route_selection, caller_selection) {
            (Some(route), Some(caller)) => {
                let mut combined = route_args;
                combined.extend_from_slice(args);
                (Some(format!("{route} AND ({caller})")), combined)
            }
            (Some(route), None) => (Some(route.to_string()), route_args),
            (None, caller) => (caller.map(str::to_string), args.to_vec()),
        };

        let spec = SelectSpec {
            from,
            projection,
            selection: selection.as_deref(),
            args: &args,
            sort_order,
        };
        // Registered before the read; a commit racing it still marks the cursor stale.
        let watch = CursorWatch::register(path.clone(), &self.notifier);
        let rows = {
            let conn = self.store.open_readable();
            SqliteTableRepository::try_new(&conn)?.select(&spec)?
        };

        debug!(
            "event=provider_query module=provider status=ok route={} rows={} duration_ms={}",
            resolved.route().as_str(),
            rows.rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Cursor::with_watch(rows, watch))
    }

    /// Inserts one row into the table `path` addresses.
    ///
    /// Returns the new row's resource path.
    pub fn insert(&self, path: &ResourcePath, values: &ContentValues) -> ProviderResult<ResourcePath> {
        let started_at = Instant::now();
        let table = self.mutation_table(path)?;
        let values = prepare_values(table, values)?;

        let result = {
            let conn = self.store.open_writable();
            insert_one(&conn, table, &values)
        };
        let id = log_outcome("provider_insert", table, started_at, result)?;
        if id <= 0 {
            return Err(ProviderError::InsertFailed(path.to_string()));
        }

        self.notifier.notify_change(path);
        Ok(build_row_uri(table, id))
    }

    /// Inserts every row of `rows` into the weather table atomically.
    ///
    /// Returns the number of rows written; rows replacing an existing
    /// `(date, location_id)` row count too. Any storage error rolls the whole
    /// batch back before it is returned.
    pub fn bulk_insert(&self, path: &ResourcePath, rows: &[ContentValues]) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let route = self.resolve(path)?.route();
        if route != Route::Weather {
            return Err(ProviderError::UnsupportedBulkTarget(path.to_string()));
        }

        let prepared = rows
            .iter()
            .map(|values| prepare_values(Table::Weather, values))
            .collect::<ProviderResult<Vec<_>>>()?;

        let result = {
            let mut conn = self.store.open_writable();
            insert_batch(&mut conn, &prepared)
        };
        let inserted = match result {
            Ok(inserted) => {
                info!(
                    "event=provider_bulk_insert module=provider status=ok table=weather requested={} inserted={} duration_ms={}",
                    prepared.len(),
                    inserted,
                    started_at.elapsed().as_millis()
                );
                inserted
            }
            Err(err) => {
                warn!(
                    "event=provider_bulk_insert module=provider status=error table=weather requested={} rolled_back=true duration_ms={} error={}",
                    prepared.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        if inserted > 0 {
            self.notifier.notify_change(path);
        }
        Ok(inserted)
    }

    /// Deletes rows of the table `path` addresses.
    ///
    /// A `None` selection deletes every row. Returns the deleted row count.
    pub fn delete(
        &self,
        path: &ResourcePath,
        selection: Option<&str>,
        args: &[Value],
    ) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let table = self.mutation_table(path)?;

        let result = {
            let conn = self.store.open_writable();
            SqliteTableRepository::try_new(&conn)
                .and_then(|repo| repo.delete(table, selection, args))
                .map_err(ProviderError::from)
        };
        let deleted = log_outcome("provider_delete", table, started_at, result)?;

        if deleted > 0 {
            self.notifier.notify_change(path);
        }
        Ok(deleted)
    }

    /// Updates rows of the table `path` addresses. Returns the updated row count.
    pub fn update(
        &self,
        path: &ResourcePath,
        values: &ContentValues,
        selection: Option<&str>,
        args: &[Value],
    ) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let table = self.mutation_table(path)?;
        let values = prepare_values(table, values)?;

        let result = {
            let conn = self.store.open_writable();
            SqliteTableRepository::try_new(&conn)
                .and_then(|repo| repo.update(table, &values, selection, args))
                .map_err(ProviderError::from)
        };
        let updated = log_outcome("provider_update", table, started_at, result)?;

        if updated > 0 {
            self.notifier.notify_change(path);
        }
        Ok(updated)
    }

    fn resolve(&self, path: &ResourcePath) -> ProviderResult<ResolvedRoute> {
        self.matcher
            .resolve(path)
            .ok_or_else(|| ProviderError::UnknownResource(path.to_string()))
    }

    /// Table targeted by a table-level mutation path.
    fn mutation_table(&self, path: &ResourcePath) -> ProviderResult<Table> {
        match self.resolve(path)?.route() {
            Route::Weather => Ok(Table::Weather),
            Route::Location => Ok(Table::Location),
            Route::WeatherByLocation | Route::WeatherByLocationAndDate => {
                Err(ProviderError::UnknownResource(path.to_string()))
            }
        }
    }
}

fn insert_one(conn: &Connection, table: Table, values: &ContentValues) -> ProviderResult<i64> {
    let repo = SqliteTableRepository::try_new(conn)?;
    Ok(repo.insert(table, values)?)
}

fn insert_batch(conn: &mut Connection, rows: &[ContentValues]) -> ProviderResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut inserted = 0;
    {
        let repo = SqliteTableRepository::try_new(&tx)?;
        for values in rows {
            if repo.insert(Table::Weather, values)? > 0 {
                inserted += 1;
            }
        }
    }
    tx.commit()?;
    Ok(inserted)
}

/// Copies `values`, normalizing the weather `date` column when present.
fn prepare_values(table: Table, values: &ContentValues) -> ProviderResult<ContentValues> {
    let mut prepared = values.clone();
    if table != Table::Weather || !values.contains_key(WeatherEntry::COLUMN_DATE) {
        return Ok(prepared);
    }

    let raw = values.get_i64(WeatherEntry::COLUMN_DATE).ok_or_else(|| {
        ProviderError::InvalidArgument(format!(
            "`{}` must be an integer epoch-seconds value",
            WeatherEntry::COLUMN_DATE
        ))
    })?;
    let normalized = normalize_date(raw).ok_or_else(|| {
        ProviderError::InvalidArgument(format!("date {raw} is outside the supported range"))
    })?;
    prepared.put(WeatherEntry::COLUMN_DATE, normalized);
    Ok(prepared)
}

fn log_outcome<T: std::fmt::Display + Copy>(
    event: &str,
    table: Table,
    started_at: Instant,
    result: ProviderResult<T>,
) -> ProviderResult<T> {
    match &result {
        Ok(value) => info!(
            "event={} module=provider status=ok table={} result={} duration_ms={}",
            event,
            table.name(),
            value,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={} module=provider status=error table={} duration_ms={} error={}",
            event,
            table.name(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}
