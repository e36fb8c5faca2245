//! Ordered registry of table declarations.
//!
//! The registry is processed in declaration order, so a table referencing
//! another through a foreign key must come after the table it references.
//! [`Registry::new`] checks this (and the rest of the declaration rules)
//! up front so a bad configuration fails before any connection is opened.

use crate::schema::{is_valid_identifier, ColumnDefinition, ColumnType, ForeignKey, TableSpec};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Error type for registry construction and loading.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Error reading the registry file
    #[error("Failed to read registry file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse registry YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No tables declared
    #[error("Registry declares no tables")]
    Empty,

    /// Same table declared twice
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Table or column name cannot be used as an identifier
    #[error("Invalid identifier '{name}' in table '{table}'")]
    InvalidIdentifier { table: String, name: String },

    /// Same column declared twice in one table
    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// Table declares no key columns
    #[error("Table '{0}' declares no key columns")]
    EmptyKey(String),

    /// Key column not among the declared columns
    #[error("Key column '{column}' is not declared in table '{table}'")]
    UnknownKeyColumn { table: String, column: String },

    /// Same key column listed twice
    #[error("Key column '{column}' is listed more than once in table '{table}'")]
    DuplicateKeyColumn { table: String, column: String },

    /// Foreign-key column not among the declared columns
    #[error("Foreign-key column '{column}' is not declared in table '{table}'")]
    UnknownForeignKeyColumn { table: String, column: String },

    /// Foreign key with mismatched column lists
    #[error(
        "Foreign key from '{table}' to '{references}' lists {local} local and {remote} referenced columns"
    )]
    ForeignKeyArity {
        table: String,
        references: String,
        local: usize,
        remote: usize,
    },

    /// Foreign-key target is neither the table itself nor an earlier registry entry
    #[error("Table '{table}' references '{references}', which is not declared before it")]
    ForeignKeyOrder { table: String, references: String },

    /// Referenced column not declared on the referenced table
    #[error("Table '{table}' references column '{column}' not declared in table '{references}'")]
    UnknownReferencedColumn {
        table: String,
        references: String,
        column: String,
    },
}

/// Ordered, validated sequence of table declarations.
#[derive(Debug, Clone)]
pub struct Registry {
    tables: Vec<TableSpec>,
}

#[derive(Deserialize)]
struct RegistryFile {
    tables: Vec<TableSpec>,
}

impl Registry {
    /// Validate and wrap an ordered list of table declarations.
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, RegistryError> {
        validate(&tables)?;
        Ok(Self { tables })
    }

    /// Load a registry from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a registry from a YAML string with a top-level `tables` list.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        Self::new(file.tables)
    }

    /// The shipped metadata tables.
    ///
    /// `casos_uso` comes first because `origenes` references it.
    pub fn metadata_tables() -> Self {
        let tables = vec![
            TableSpec::new("casos_uso", "casos_uso")
                .column(ColumnDefinition::new("id_caso_uso", ColumnType::String))
                .column(ColumnDefinition::new("nombre", ColumnType::String))
                .column(ColumnDefinition::new("activo", ColumnType::Boolean))
                .key(["id_caso_uso"]),
            TableSpec::new("origenes", "origenes")
                .column(ColumnDefinition::new("id_origen", ColumnType::String))
                .column(ColumnDefinition::new("nombre_origen", ColumnType::String))
                .column(ColumnDefinition::new("activo", ColumnType::Boolean))
                .column(ColumnDefinition::new("id_caso_uso", ColumnType::String))
                .key(["id_origen"])
                .foreign_key(ForeignKey::new(
                    ["id_caso_uso"],
                    "casos_uso",
                    ["id_caso_uso"],
                )),
            TableSpec::new("orquestadores", "orquestadores")
                .column(ColumnDefinition::new("id_orquestador", ColumnType::String))
                .column(ColumnDefinition::new("nombre", ColumnType::String))
                .column(ColumnDefinition::new("activo", ColumnType::Boolean))
                .key(["id_orquestador"]),
        ];
        Self { tables }
    }

    /// Table declarations in processing order.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Iterate table declarations in processing order.
    pub fn iter(&self) -> std::slice::Iter<'_, TableSpec> {
        self.tables.iter()
    }

    /// Get a table declaration by table name.
    pub fn get(&self, table: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Position of a table in processing order.
    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.table == table)
    }

    /// Number of declared tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the registry is empty (never true for a validated registry).
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a TableSpec;
    type IntoIter = std::slice::Iter<'a, TableSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

fn validate(tables: &[TableSpec]) -> Result<(), RegistryError> {
    if tables.is_empty() {
        return Err(RegistryError::Empty);
    }

    for (idx, spec) in tables.iter().enumerate() {
        let table = || spec.table.clone();
        let invalid = |name: &str| RegistryError::InvalidIdentifier {
            table: table(),
            name: name.to_string(),
        };

        if !is_valid_identifier(&spec.table) {
            return Err(invalid(&spec.table));
        }
        if tables[..idx].iter().any(|t| t.table == spec.table) {
            return Err(RegistryError::DuplicateTable(table()));
        }

        let mut seen = HashSet::new();
        for column in &spec.columns {
            if !is_valid_identifier(&column.name) {
                return Err(invalid(&column.name));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(RegistryError::DuplicateColumn {
                    table: table(),
                    column: column.name.clone(),
                });
            }
        }

        if spec.key.is_empty() {
            return Err(RegistryError::EmptyKey(table()));
        }
        let mut key_seen = HashSet::new();
        for key in &spec.key {
            if spec.get_column(key).is_none() {
                return Err(RegistryError::UnknownKeyColumn {
                    table: table(),
                    column: key.clone(),
                });
            }
            if !key_seen.insert(key.as_str()) {
                return Err(RegistryError::DuplicateKeyColumn {
                    table: table(),
                    column: key.clone(),
                });
            }
        }

        for fk in &spec.foreign_keys {
            validate_foreign_key(spec, fk, &tables[..idx])?;
        }
    }

    Ok(())
}

fn validate_foreign_key(
    spec: &TableSpec,
    fk: &ForeignKey,
    earlier: &[TableSpec],
) -> Result<(), RegistryError> {
    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        return Err(RegistryError::ForeignKeyArity {
            table: spec.table.clone(),
            references: fk.references.clone(),
            local: fk.columns.len(),
            remote: fk.referenced_columns.len(),
        });
    }

    if let Some(column) = fk.columns.iter().find(|c| spec.get_column(c).is_none()) {
        return Err(RegistryError::UnknownForeignKeyColumn {
            table: spec.table.clone(),
            column: column.clone(),
        });
    }

    // A table may reference itself; anything else must be declared earlier
    let target = std::iter::once(spec)
        .filter(|s| s.table == fk.references)
        .chain(earlier.iter().filter(|t| t.table == fk.references))
        .next()
        .ok_or_else(|| RegistryError::ForeignKeyOrder {
            table: spec.table.clone(),
            references: fk.references.clone(),
        })?;

    if let Some(column) = fk
        .referenced_columns
        .iter()
        .find(|c| target.get_column(c).is_none())
    {
        return Err(RegistryError::UnknownReferencedColumn {
            table: spec.table.clone(),
            references: fk.references.clone(),
            column: column.clone(),
        });
    }

    Ok(())
}
