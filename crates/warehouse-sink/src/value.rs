//! Typed statement parameters

use sync_core::ColumnType;

/// A value bound to a statement parameter.
///
/// Nulls keep the declared column type so backends can bind a typed NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// NULL of the given column type
    Null(ColumnType),
}

impl SqlValue {
    /// Column type of the value.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Text(_) => ColumnType::String,
            Self::Bool(_) => ColumnType::Boolean,
            Self::Null(ty) => *ty,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// SQL equality: NULL never equals anything, including NULL.
    pub fn sql_eq(&self, other: &SqlValue) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null(_) => write!(f, "NULL"),
        }
    }
}
