//! Table-level SQL execution for the weather cache.
//!
//! # Responsibility
//! - Build and run SELECT/INSERT/UPDATE/DELETE statements from caller input.
//! - Keep identifier validation and bind-parameter ordering in one place.
//!
//! # Invariants
//! - Column names, projections and sort terms are validated before any SQL is
//!   built; values are always bound, never interpolated.
//! - A `None` delete selection matches every row.
//! - Bind order is: written values first, then selection arguments.

use crate::contract::{LocationEntry, Table, WeatherEntry};
use crate::db::DbError;
use crate::values::ContentValues;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));
static PROJECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z_][a-z0-9_]*\.)?(?:[a-z_][a-z0-9_]*|\*)(?:\s+AS\s+[a-z_][a-z0-9_]*)?$",
    )
    .expect("valid projection regex")
});
static SORT_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z_][a-z0-9_]*\.)?[a-z_][a-z0-9_]*(?:\s+(?:ASC|DESC))?$")
        .expect("valid sort term regex")
});

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from table-level SQL execution.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Column, projection or sort term is not a plain column reference.
    InvalidIdentifier(String),
    /// Required table is missing from the connected database.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(value) => {
                write!(f, "`{value}` is not a valid column reference")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "weather store requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Inputs for one SELECT statement.
#[derive(Debug, Clone, Copy)]
pub struct SelectSpec<'a> {
    /// Table name or join clause; always crate-provided.
    pub from: &'a str,
    /// Columns to return; `None` returns all.
    pub projection: Option<&'a [&'a str]>,
    /// WHERE body with `?` placeholders.
    pub selection: Option<&'a str>,
    pub args: &'a [Value],
    /// Comma separated `column [ASC|DESC]` terms.
    pub sort_order: Option<&'a str>,
}

/// Materialized result of a SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Repository interface for table-level operations.
pub trait TableRepository {
    fn select(&self, spec: &SelectSpec<'_>) -> RepoResult<RowSet>;
    /// Inserts one row and returns the store-assigned row id.
    fn insert(&self, table: Table, values: &ContentValues) -> RepoResult<i64>;
    fn update(
        &self,
        table: Table,
        values: &ContentValues,
        selection: Option<&str>,
        args: &[Value],
    ) -> RepoResult<usize>;
    fn delete(&self, table: Table, selection: Option<&str>, args: &[Value]) -> RepoResult<usize>;
}

/// SQLite-backed table repository over a borrowed connection.
pub struct SqliteTableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTableRepository<'conn> {
    /// Wraps a connection whose schema is already applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in [LocationEntry::TABLE_NAME, WeatherEntry::TABLE_NAME] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl TableRepository for SqliteTableRepository<'_> {
    fn select(&self, spec: &SelectSpec<'_>) -> RepoResult<RowSet> {
        let columns = match spec.projection {
            Some(projection) if !projection.is_empty() => {
                for item in projection {
                    validate_projection_item(item)?;
                }
                projection.join(", ")
            }
            _ => "*".to_string(),
        };

        let mut sql = format!("SELECT {columns} FROM {}", spec.from);
        if let Some(selection) = non_blank(spec.selection) {
            sql.push_str(&format!(" WHERE {selection}"));
        }
        if let Some(sort_order) = non_blank(spec.sort_order) {
            validate_sort_order(sort_order)?;
            sql.push_str(&format!(" ORDER BY {sort_order}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let column_count = column_names.len();

        let mut rows = stmt.query(params_from_iter(spec.args.iter()))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(row.get::<_, Value>(index)?);
            }
            collected.push(values);
        }

        Ok(RowSet {
            columns: column_names,
            rows: collected,
        })
    }

    fn insert(&self, table: Table, values: &ContentValues) -> RepoResult<i64> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table.name())
        } else {
            let mut columns = Vec::with_capacity(values.len());
            for (column, _) in values.iter() {
                validate_identifier(column)?;
                columns.push(column);
            }
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                table.name(),
                columns.join(", ")
            )
        };

        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(
        &self,
        table: Table,
        values: &ContentValues,
        selection: Option<&str>,
        args: &[Value],
    ) -> RepoResult<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(values.len());
        for (column, _) in values.iter() {
            validate_identifier(column)?;
            assignments.push(format!("{column} = ?"));
        }

        let mut sql = format!("UPDATE {} SET {}", table.name(), assignments.join(", "));
        if let Some(selection) = non_blank(selection) {
            sql.push_str(&format!(" WHERE {selection}"));
        }

        let binds = values.iter().map(|(_, value)| value).chain(args.iter());
        Ok(self.conn.execute(&sql, params_from_iter(binds))?)
    }

    fn delete(&self, table: Table, selection: Option<&str>, args: &[Value]) -> RepoResult<usize> {
        let selection = non_blank(selection).unwrap_or("1");
        let sql = format!("DELETE FROM {} WHERE {selection}", table.name());
        Ok(self.conn.execute(&sql, params_from_iter(args.iter()))?)
    }
}

/// Validates one bare column name.
pub fn validate_identifier(value: &str) -> RepoResult<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(RepoError::InvalidIdentifier(value.to_string()))
    }
}

fn validate_projection_item(value: &str) -> RepoResult<()> {
    if PROJECTION_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(RepoError::InvalidIdentifier(value.to_string()))
    }
}

fn validate_sort_order(value: &str) -> RepoResult<()> {
    for term in value.split(',') {
        if !SORT_TERM_RE.is_match(term.trim()) {
            return Err(RepoError::InvalidIdentifier(term.trim().to_string()));
        }
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
