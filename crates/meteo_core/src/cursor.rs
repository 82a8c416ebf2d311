//! Live query result handles.
//!
//! # Responsibility
//! - Expose materialized query rows with a row position and typed getters.
//! - Track whether the data behind the query changed since it was read.
//!
//! # Invariants
//! - A new cursor is positioned before the first row.
//! - The change subscription is released on `close()` or drop, whichever
//!   comes first.

use crate::notify::{ChangeNotifier, Subscription};
use crate::path::ResourcePath;
use crate::repo::table_repo::RowSet;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors from reading the current cursor row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// Cursor is before the first row or after the last one.
    NoCurrentRow,
    UnknownColumn(String),
    TypeMismatch {
        column: String,
        expected: &'static str,
    },
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCurrentRow => write!(f, "cursor is not positioned on a row"),
            Self::UnknownColumn(column) => write!(f, "cursor has no column `{column}`"),
            Self::TypeMismatch { column, expected } => {
                write!(f, "column `{column}` does not hold a {expected} value")
            }
        }
    }
}

impl Error for CursorError {}

/// Change subscription taken for a query before its rows are read.
pub struct CursorWatch {
    path: ResourcePath,
    stale: Arc<AtomicBool>,
    subscription: Subscription,
}

impl CursorWatch {
    /// Starts listening for changes at or below `path`.
    pub fn register(path: ResourcePath, notifier: &ChangeNotifier) -> Self {
        let stale = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stale);
        let subscription = notifier.register(&path, true, move |_| {
            flag.store(true, Ordering::SeqCst);
        });
        Self {
            path,
            stale,
            subscription,
        }
    }
}

/// Query result positioned before its first row.
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// `-1` before the first row, `rows.len()` after the last.
    position: isize,
    notification_path: ResourcePath,
    stale: Arc<AtomicBool>,
    subscription: Option<Subscription>,
}

impl Cursor {
    /// Wraps `rows` and subscribes to changes at or below `path`.
    pub fn new(rows: RowSet, path: ResourcePath, notifier: &ChangeNotifier) -> Self {
        Self::with_watch(rows, CursorWatch::register(path, notifier))
    }

    /// Wraps `rows` read after `watch` was registered.
    ///
    /// Changes announced between registration and now leave the cursor stale.
    pub fn with_watch(rows: RowSet, watch: CursorWatch) -> Self {
        Self {
            columns: rows.columns,
            rows: rows.rows,
            position: -1,
            notification_path: watch.path,
            stale: watch.stale,
            subscription: Some(watch.subscription),
        }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Index of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn move_to_first(&mut self) -> bool {
        self.move_to_position(0)
    }

    pub fn move_to_next(&mut self) -> bool {
        self.move_to_position(self.position + 1)
    }

    /// Moves to `position`, clamping to just before/after the rows.
    ///
    /// Returns whether the cursor now points at a row.
    pub fn move_to_position(&mut self, position: isize) -> bool {
        let row_count = self.rows.len() as isize;
        self.position = position.clamp(-1, row_count);
        self.position >= 0 && self.position < row_count
    }

    /// Raw value of `column` in the current row.
    pub fn value(&self, column: &str) -> Result<&Value, CursorError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| CursorError::UnknownColumn(column.to_string()))?;
        let row = usize::try_from(self.position)
            .ok()
            .and_then(|position| self.rows.get(position))
            .ok_or(CursorError::NoCurrentRow)?;
        row.get(index).ok_or(CursorError::NoCurrentRow)
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, CursorError> {
        match self.value(column)? {
            Value::Integer(value) => Ok(*value),
            _ => Err(mismatch(column, "integer")),
        }
    }

    /// Reads a REAL column; integers are widened.
    pub fn get_f64(&self, column: &str) -> Result<f64, CursorError> {
        match self.value(column)? {
            Value::Real(value) => Ok(*value),
            Value::Integer(value) => Ok(*value as f64),
            _ => Err(mismatch(column, "real")),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<String, CursorError> {
        match self.value(column)? {
            Value::Text(value) => Ok(value.clone()),
            _ => Err(mismatch(column, "text")),
        }
    }

    pub fn is_null(&self, column: &str) -> Result<bool, CursorError> {
        Ok(matches!(self.value(column)?, Value::Null))
    }

    /// Path this cursor is registered on.
    pub fn notification_path(&self) -> &ResourcePath {
        &self.notification_path
    }

    /// Whether a change was announced for this cursor's data after it was read.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Whether the cursor still holds its change subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Releases the change subscription; rows stay readable.
    pub fn close(&mut self) {
        self.subscription.take();
    }
}

fn mismatch(column: &str, expected: &'static str) -> CursorError {
    CursorError::TypeMismatch {
        column: column.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::{Cursor, CursorError, CursorWatch};
    use crate::notify::ChangeNotifier;
    use crate::path::ResourcePath;
    use crate::repo::table_repo::RowSet;
    use rusqlite::types::Value;

    fn sample(notifier: &ChangeNotifier) -> Cursor {
        let rows = RowSet {
            columns: vec!["_id".to_string(), "city_name".to_string()],
            rows: vec![
                vec![Value::Integer(1), Value::Text("Oslo".to_string())],
                vec![Value::Integer(2), Value::Text("Bergen".to_string())],
            ],
        };
        Cursor::new(
            rows,
            ResourcePath::parse("content://com.mhv.meteoapp/location").unwrap(),
            notifier,
        )
    }

    #[test]
    fn starts_before_first_row() {
        let notifier = ChangeNotifier::new();
        let mut cursor = sample(&notifier);

        assert_eq!(cursor.position(), -1);
        assert_eq!(cursor.get_i64("_id"), Err(CursorError::NoCurrentRow));
        assert!(cursor.move_to_next());
        assert_eq!(cursor.get_i64("_id"), Ok(1));
        assert!(cursor.move_to_next());
        assert_eq!(cursor.get_string("city_name").unwrap(), "Bergen");
        assert!(!cursor.move_to_next());
        assert!(!cursor.move_to_next());
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn type_mismatch_and_unknown_column_are_reported() {
        let notifier = ChangeNotifier::new();
        let mut cursor = sample(&notifier);
        cursor.move_to_first();

        assert!(matches!(
            cursor.get_i64("city_name"),
            Err(CursorError::TypeMismatch { .. })
        ));
        assert_eq!(
            cursor.get_f64("missing"),
            Err(CursorError::UnknownColumn("missing".to_string()))
        );
        assert_eq!(cursor.get_f64("_id"), Ok(1.0));
    }

    #[test]
    fn change_before_rows_arrive_marks_cursor_stale() {
        let notifier = ChangeNotifier::new();
        let path = ResourcePath::parse("content://com.mhv.meteoapp/weather/99705").unwrap();
        let watch = CursorWatch::register(path.clone(), &notifier);

        notifier.notify_change(&path);
        let cursor = Cursor::with_watch(RowSet::default(), watch);

        assert!(cursor.is_stale());
        assert_eq!(cursor.notification_path(), &path);
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn close_and_drop_release_the_subscription() {
        let notifier = ChangeNotifier::new();
        let mut first = sample(&notifier);
        let second = sample(&notifier);
        assert_eq!(notifier.observer_count(), 2);

        first.close();
        assert!(!first.is_subscribed());
        assert_eq!(notifier.observer_count(), 1);

        drop(second);
        assert_eq!(notifier.observer_count(), 0);
    }
}
