//! Column/value sets used by every write operation.

use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Ordered mapping from column name to SQLite value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentValues {
    entries: BTreeMap<String, Value>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, replacing any previous value.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(column.into(), value.into());
        self
    }

    /// Builder form of [`ContentValues::put`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries.get(column)
    }

    /// Reads `column` as an integer.
    ///
    /// Text values are parsed; real values are accepted only when whole.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.entries.get(column)? {
            Value::Integer(value) => Some(*value),
            Value::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            Value::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.entries.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::ContentValues;
    use rusqlite::types::Value;

    #[test]
    fn get_i64_accepts_integer_text_and_whole_reals() {
        let values = ContentValues::new()
            .with("a", 42_i64)
            .with("b", "17".to_string())
            .with("c", 3.0_f64)
            .with("d", 3.5_f64);

        assert_eq!(values.get_i64("a"), Some(42));
        assert_eq!(values.get_i64("b"), Some(17));
        assert_eq!(values.get_i64("c"), Some(3));
        assert_eq!(values.get_i64("d"), None);
        assert_eq!(values.get_i64("missing"), None);
    }

    #[test]
    fn put_replaces_previous_value() {
        let mut values = ContentValues::new();
        values.put("city_name", "Paris".to_string());
        values.put("city_name", "Lyon".to_string());

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("city_name"), Some(&Value::Text("Lyon".to_string())));
    }
}
