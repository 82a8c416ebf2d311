//! Process-wide store handles.
//!
//! # Responsibility
//! - Own the writer connection and the reader pool of one database.
//! - Hand out the same `Arc<Store>` for repeated opens of one file.
//!
//! # Invariants
//! - For a file path, schema DDL runs at most once per live handle set; the
//!   registry lock is held across bootstrap so concurrent first opens agree.
//! - The registry keeps only weak references; dropping the last handle closes
//!   every connection of that store.
//! - In-memory stores are never shared and serve reads from the writer.

use super::open::{open_file_reader, open_file_writer, open_memory, DEFAULT_BUSY_TIMEOUT};
use super::migrations::DATABASE_VERSION;
use super::{DbError, DbResult};
use log::info;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

const DEFAULT_READER_CONNECTIONS: usize = 4;

static OPEN_STORES: Lazy<Mutex<HashMap<PathBuf, Weak<Store>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub location: StoreLocation,
    /// Schema version; raising it recreates both tables.
    pub version: u32,
    /// Read-only connections kept for concurrent reads (file stores only).
    pub reader_connections: usize,
    pub busy_timeout: Duration,
}

impl StoreOptions {
    /// Options for a database file at the current schema version.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            ..Self::memory()
        }
    }

    /// Options for a private in-memory database.
    pub fn memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            version: DATABASE_VERSION,
            reader_connections: DEFAULT_READER_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn reader_connections(mut self, count: usize) -> Self {
        self.reader_connections = count;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Guard over one connection of a store; released on drop.
pub type StoreConnection<'a> = MutexGuard<'a, Connection>;

/// Shared handle to one embedded database.
pub struct Store {
    location: StoreLocation,
    version: u32,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location)
            .field("version", &self.version)
            .field("readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens (or joins) the store described by `options`.
    ///
    /// # Errors
    /// - `VersionConflict` when a live handle for the same file uses another
    ///   schema version.
    /// - Any bootstrap error from opening the writer or reader connections.
    pub fn open(options: &StoreOptions) -> DbResult<Arc<Store>> {
        match &options.location {
            StoreLocation::Memory => {
                let writer = open_memory(options.version, options.busy_timeout)?;
                Ok(Arc::new(Self::new(StoreLocation::Memory, options.version, writer, Vec::new())))
            }
            StoreLocation::File(path) => Self::open_shared_file(path, options),
        }
    }

    /// Opens a private in-memory store at the current schema version.
    pub fn open_in_memory() -> DbResult<Arc<Store>> {
        Self::open(&StoreOptions::memory())
    }

    fn open_shared_file(path: &Path, options: &StoreOptions) -> DbResult<Arc<Store>> {
        let key = registry_key(path)?;
        let mut registry = lock(&OPEN_STORES);

        if let Some(existing) = registry.get(&key).and_then(Weak::upgrade) {
            if existing.version != options.version {
                return Err(DbError::VersionConflict {
                    path: key,
                    open_version: existing.version,
                    requested_version: options.version,
                });
            }
            info!(
                "event=store_open module=db status=ok mode=file reused=true version={}",
                existing.version
            );
            return Ok(existing);
        }

        let writer = open_file_writer(&key, options.version, options.busy_timeout)?;
        let readers = (0..options.reader_connections)
            .map(|_| open_file_reader(&key, options.busy_timeout).map(Mutex::new))
            .collect::<DbResult<Vec<_>>>()?;

        let store = Arc::new(Self::new(
            StoreLocation::File(key.clone()),
            options.version,
            writer,
            readers,
        ));
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.insert(key, Arc::downgrade(&store));
        info!(
            "event=store_open module=db status=ok mode=file reused=false version={} readers={}",
            options.version,
            store.readers.len()
        );
        Ok(store)
    }

    fn new(
        location: StoreLocation,
        version: u32,
        writer: Connection,
        readers: Vec<Mutex<Connection>>,
    ) -> Self {
        Self {
            location,
            version,
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        }
    }

    /// Exclusive access to the writer connection.
    ///
    /// Holding the guard blocks every other write to this store.
    pub fn open_writable(&self) -> StoreConnection<'_> {
        lock(&self.writer)
    }

    /// A connection for reads.
    ///
    /// File stores hand out an idle reader when one is free, otherwise wait on
    /// the next one in rotation. In-memory stores share the writer.
    pub fn open_readable(&self) -> StoreConnection<'_> {
        if self.readers.is_empty() {
            return self.open_writable();
        }
        for reader in &self.readers {
            if let Ok(guard) = reader.try_lock() {
                return guard;
            }
        }
        let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        lock(&self.readers[index])
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Database file path; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path.as_path()),
            StoreLocation::Memory => None,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == StoreLocation::Memory
    }
}

/// Deletes a database file together with its WAL, SHM and journal siblings.
///
/// Returns whether the main database file existed.
///
/// # Errors
/// - `StoreInUse` while any handle for this file is alive in the process.
/// - `Io` when a file exists but cannot be removed.
pub fn delete_database(path: impl AsRef<Path>) -> DbResult<bool> {
    let key = registry_key(path.as_ref())?;
    let mut registry = lock(&OPEN_STORES);
    if registry
        .get(&key)
        .is_some_and(|weak| weak.strong_count() > 0)
    {
        return Err(DbError::StoreInUse(key));
    }
    registry.remove(&key);

    let existed = remove_if_exists(&key)?;
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut sibling = key.clone().into_os_string();
        sibling.push(suffix);
        remove_if_exists(Path::new(&sibling))?;
    }
    info!(
        "event=db_delete module=db status=ok existed={}",
        existed
    );
    Ok(existed)
}

fn remove_if_exists(path: &Path) -> DbResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(DbError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn registry_key(path: &Path) -> DbResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| DbError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
