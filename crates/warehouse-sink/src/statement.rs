//! Statements issued by the engine

use crate::value::SqlValue;
use sync_core::TableSpec;

/// How a table is (re)created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Create only when no table of that name exists
    IfNotExists,
    /// Drop any existing table of that name and create it afresh (lossy)
    Replace,
}

/// A single unit of work sent to the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Table DDL
    CreateTable { spec: TableSpec, mode: CreateMode },
    /// Match-then-update-else-insert of one record
    Merge(MergeStatement),
}

impl Statement {
    /// Target table of the statement.
    pub fn table(&self) -> &str {
        match self {
            Statement::CreateTable { spec, .. } => &spec.table,
            Statement::Merge(merge) => &merge.table,
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::CreateTable {
                spec,
                mode: CreateMode::IfNotExists,
            } => write!(f, "CREATE TABLE IF NOT EXISTS {}", spec.table),
            Statement::CreateTable {
                spec,
                mode: CreateMode::Replace,
            } => write!(f, "CREATE OR REPLACE TABLE {}", spec.table),
            Statement::Merge(merge) => write!(
                f,
                "MERGE INTO {} ON ({})",
                merge.table,
                merge.key.join(", ")
            ),
        }
    }
}

/// Merge of one record into a table.
///
/// Rows match when every key column equals the record's value for it.
/// Matched rows get every present non-key column updated; otherwise a row is
/// inserted with every present column. Columns absent from the record are
/// not part of the statement at all.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStatement {
    /// Target table
    pub table: String,
    /// Key columns (all present in `columns`)
    pub key: Vec<String>,
    /// Present columns, in declaration order
    pub columns: Vec<String>,
    /// Values, aligned with `columns`
    pub values: Vec<SqlValue>,
}

impl MergeStatement {
    /// Build a merge from key columns and `(column, value)` assignments.
    pub fn new(
        table: impl Into<String>,
        key: Vec<String>,
        assignments: Vec<(String, SqlValue)>,
    ) -> Self {
        let (columns, values) = assignments.into_iter().unzip();
        Self {
            table: table.into(),
            key,
            columns,
            values,
        }
    }

    /// Non-key columns, which are updated on match.
    pub fn update_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| !self.key.contains(c))
            .map(String::as_str)
    }

    /// Value assigned to a column.
    pub fn value_of(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Outcome of a successful statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowEffect {
    /// Rows inserted, updated, or (for DDL) zero
    pub rows_affected: u64,
}

impl RowEffect {
    /// Effect touching `rows_affected` rows.
    pub fn rows(rows_affected: u64) -> Self {
        Self { rows_affected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_update_columns_exclude_key() {
        let merge = MergeStatement::new(
            "pairs",
            vec!["a".into(), "b".into()],
            vec![
                ("a".into(), SqlValue::Text("1".into())),
                ("b".into(), SqlValue::Text("2".into())),
                ("label".into(), SqlValue::Text("x".into())),
            ],
        );
        assert_eq!(merge.update_columns().collect::<Vec<_>>(), vec!["label"]);
        assert_eq!(merge.value_of("b"), Some(&SqlValue::Text("2".into())));
        assert_eq!(merge.value_of("missing"), None);
    }

    #[test]
    fn test_display() {
        let merge = Statement::Merge(MergeStatement::new(
            "pairs",
            vec!["a".into(), "b".into()],
            vec![],
        ));
        assert_eq!(merge.to_string(), "MERGE INTO pairs ON (a, b)");
        assert_eq!(merge.table(), "pairs");
    }
}
