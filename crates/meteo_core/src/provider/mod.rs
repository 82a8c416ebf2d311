//! Resource-addressed data access over the weather store.
//!
//! # Responsibility
//! - Route resource paths to query and mutation strategies.
//! - Announce changes after successful mutations.
//!
//! # Invariants
//! - An unmatched path fails with `UnknownResource` before the store is touched.
//! - Storage failures surface unchanged; nothing is retried here.

use crate::cursor::CursorError;
use crate::repo::table_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod weather_provider;

pub use weather_provider::WeatherProvider;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error taxonomy of provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// Path matched no route (or no route valid for the operation).
    UnknownResource(String),
    /// The store did not return a usable row id.
    InsertFailed(String),
    /// Bulk insert addressed a path other than the weather table.
    UnsupportedBulkTarget(String),
    /// Caller input (column, projection, sort term, date value) was rejected.
    InvalidArgument(String),
    /// A stored row could not be read back as a typed record.
    InvalidData(String),
    /// SQLite or schema failure; any open transaction was rolled back.
    StorageFailure(RepoError),
}

impl ProviderError {
    /// Whether re-running the originating operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownResource(path) => write!(f, "unknown resource path: {path}"),
            Self::InsertFailed(path) => write!(f, "failed to insert row into {path}"),
            Self::UnsupportedBulkTarget(path) => {
                write!(f, "bulk insert is not supported for {path}")
            }
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            Self::UnknownResource(_)
            | Self::InsertFailed(_)
            | Self::UnsupportedBulkTarget(_)
            | Self::InvalidArgument(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<RepoError> for ProviderError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidIdentifier(_) => Self::InvalidArgument(value.to_string()),
            RepoError::Db(_) | RepoError::MissingRequiredTable(_) => Self::StorageFailure(value),
        }
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(RepoError::from(value))
    }
}

impl From<CursorError> for ProviderError {
    fn from(value: CursorError) -> Self {
        Self::InvalidData(value.to_string())
    }
}
