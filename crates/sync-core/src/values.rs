//! Snapshot record representation.
//!
//! A [`Snapshot`] is the ordered sequence of [`Record`]s decoded from one
//! source. Each record maps column names to [`ScalarValue`]s. A column that
//! is absent from a record is different from a column present with a null
//! or empty value: absent columns are left untouched on existing rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar value carried by a snapshot record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean value
    Bool(bool),

    /// Text value (JSON numbers are carried in their textual form)
    Text(String),

    /// Explicit null
    Null,
}

impl ScalarValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Text(_) => "text",
            Self::Null => "null",
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One snapshot row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, ScalarValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a field.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ScalarValue>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Get a field; `None` means the column is absent.
    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.fields.get(column)
    }

    /// Whether the column is present (possibly null).
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Column names present in this record.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate present fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of present fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Ordered records decoded from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Identifier of the source the records came from
    pub source: String,

    /// Records in source order
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Create a snapshot.
    pub fn new(source: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_differs_from_null() {
        let record = Record::new()
            .with("id", "o1")
            .with("nombre", ScalarValue::Null)
            .with("activo", "");

        assert!(record.contains("nombre"));
        assert_eq!(record.get("nombre"), Some(&ScalarValue::Null));
        assert_eq!(record.get("activo"), Some(&ScalarValue::text("")));
        assert_eq!(record.get("id_caso_uso"), None);
        assert!(!record.contains("id_caso_uso"));
    }

    #[test]
    fn test_record_from_iter() {
        let record: Record = vec![("b", ScalarValue::Bool(true)), ("a", ScalarValue::text("x"))]
            .into_iter()
            .collect();
        assert_eq!(record.len(), 2);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_scalar_kind() {
        assert_eq!(ScalarValue::Bool(false).kind(), "boolean");
        assert_eq!(ScalarValue::text("t").kind(), "text");
        assert_eq!(ScalarValue::Null.kind(), "null");
        assert!(ScalarValue::Null.is_null());
    }
}
