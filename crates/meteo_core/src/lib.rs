//! Local weather cache addressed by resource paths.
//!
//! Callers read and write forecast rows through [`WeatherProvider`] using
//! `content://com.mhv.meteoapp/...` paths; observers registered on a
//! [`ChangeNotifier`] learn when data under a path changes.

pub mod contract;
pub mod cursor;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod path;
pub mod provider;
pub mod repo;
pub mod router;
pub mod service;
pub mod values;

pub use contract::{LocationEntry, Table, WeatherEntry};
pub use cursor::{Cursor, CursorError, CursorWatch};
pub use db::{delete_database, DbError, DbResult, Store, StoreOptions};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::location::LocationRecord;
pub use model::weather::WeatherRecord;
pub use notify::{ChangeNotifier, Subscription};
pub use path::{PathError, ResourcePath};
pub use provider::{ProviderError, ProviderResult, WeatherProvider};
pub use repo::table_repo::{RepoError, RepoResult};
pub use router::{ResolvedRoute, Route, RouteMatcher};
pub use service::forecast_service::ForecastService;
pub use values::ContentValues;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
