//! Table declarations for the metadata-sync framework.
//!
//! A [`TableSpec`] is the structured form of a target table's shape: its
//! columns, the key columns used for matching records, and foreign-key
//! references to other tables. The column-definition DDL fragment is
//! rendered from this structure by each warehouse dialect, so the key
//! columns and the declared primary key can never drift apart.

use serde::{Deserialize, Serialize};

// ============================================================================
// Column Types
// ============================================================================

/// Declared type of a target column.
///
/// Only strings and booleans are supported. Each warehouse dialect maps
/// these onto its native types.
///
/// # YAML Format
///
/// ```yaml
/// type: string
/// type: boolean
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Variable-length text
    #[serde(alias = "text")]
    String,

    /// True/false flag
    #[serde(alias = "bool")]
    Boolean,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

// ============================================================================
// Column and Foreign Key Definitions
// ============================================================================

/// Single column of a target table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether this column accepts NULL. Key columns are always NOT NULL
    /// through the primary key constraint regardless of this flag.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    /// Create a new nullable column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// Create a new NOT NULL column definition.
    pub fn not_null(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }
}

/// Foreign-key reference from some columns of this table to another table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForeignKey {
    /// Local column names
    pub columns: Vec<String>,

    /// Referenced table name
    pub references: String,

    /// Referenced column names (same length and order as `columns`)
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Create a foreign key.
    pub fn new<C, R>(columns: C, references: impl Into<String>, referenced_columns: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            references: references.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Table Specification
// ============================================================================

/// Immutable declaration of one target table.
///
/// `source` identifies the snapshot that feeds the table, `key` lists the
/// columns that identify a row (the primary key), and `foreign_keys`
/// reference tables that must be declared earlier in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableSpec {
    /// Target table name
    pub table: String,

    /// Snapshot source identifier
    pub source: String,

    /// Column definitions in declaration order
    pub columns: Vec<ColumnDefinition>,

    /// Key columns used for matching (also the primary key)
    pub key: Vec<String>,

    /// Foreign-key references to other tables
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSpec {
    /// Start a table declaration with no columns.
    pub fn new(table: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            source: source.into(),
            columns: Vec::new(),
            key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a column.
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the key columns.
    pub fn key<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a foreign key.
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get the type of a column by name.
    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.get_column(name).map(|c| c.column_type)
    }

    /// Whether `name` is one of the key columns.
    pub fn is_key_column(&self, name: &str) -> bool {
        self.key.iter().any(|k| k == name)
    }

    /// All column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the tables this table references, in declaration order.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys.iter().map(|fk| fk.references.as_str())
    }
}

/// Whether `name` can be emitted as an unquoted SQL identifier.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
