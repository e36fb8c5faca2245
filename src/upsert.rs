//! Record upsert engine.
//!
//! One MERGE per record, matched on the conjunction of all key columns.
//! Record-level failures are counted and the remaining records still run;
//! only a connection-level error stops the snapshot.

use serde::Serialize;
use sync_core::{ColumnType, Record, ScalarValue, Snapshot, TableSpec};
use warehouse_sink::{MergeStatement, SqlValue, Statement, Warehouse, WarehouseError};

/// A record that cannot be turned into a merge for its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordValidationError {
    #[error("record {index}: key column '{column}' is missing")]
    MissingKeyColumn { index: usize, column: String },

    #[error("record {index}: key column '{column}' is null")]
    NullKeyColumn { index: usize, column: String },

    #[error("record {index}: column '{column}' is not declared for this table")]
    UnknownColumn { index: usize, column: String },

    #[error("record {index}: column '{column}' expects {expected}, got '{found}'")]
    InvalidValue {
        index: usize,
        column: String,
        expected: ColumnType,
        found: String,
    },
}

impl RecordValidationError {
    /// Position of the record in its snapshot.
    pub fn index(&self) -> usize {
        match self {
            RecordValidationError::MissingKeyColumn { index, .. }
            | RecordValidationError::NullKeyColumn { index, .. }
            | RecordValidationError::UnknownColumn { index, .. }
            | RecordValidationError::InvalidValue { index, .. } => *index,
        }
    }
}

/// Failure of a single record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] RecordValidationError),

    #[error("record {index}: {source}")]
    Statement {
        index: usize,
        #[source]
        source: WarehouseError,
    },
}

/// Per-table upsert tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    /// Records merged without error
    pub succeeded: usize,
    /// Records rejected before reaching the warehouse
    pub validation_failed: usize,
    /// Records whose MERGE failed
    pub statement_failed: usize,
    /// Sum of rows reported by successful merges
    pub rows_affected: u64,
    pub first_validation_error: Option<RecordValidationError>,
    pub first_statement_error: Option<String>,
}

impl UpsertReport {
    /// Records that did not make it into the table.
    pub fn failed(&self) -> usize {
        self.validation_failed + self.statement_failed
    }

    /// Records processed so far.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn record_failure(&mut self, error: RecordError) {
        match error {
            RecordError::Validation(e) => {
                self.validation_failed += 1;
                self.first_validation_error.get_or_insert(e);
            }
            RecordError::Statement { index, source } => {
                self.statement_failed += 1;
                self.first_statement_error
                    .get_or_insert_with(|| format!("record {index}: {source}"));
            }
        }
    }
}

/// A connection-level error stopped the snapshot part-way.
#[derive(Debug, thiserror::Error)]
#[error("upsert aborted after {} records: {error}", .report.processed())]
pub struct UpsertAborted {
    /// Tally of the records processed before the failure
    pub report: UpsertReport,
    #[source]
    pub error: WarehouseError,
}

/// Builds and applies one merge per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertEngine;

impl UpsertEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate `record` against `spec` and build its merge.
    ///
    /// Columns appear in declaration order; columns absent from the record
    /// are left out entirely, so a matched row keeps its stored value.
    pub fn merge_statement(
        &self,
        spec: &TableSpec,
        index: usize,
        record: &Record,
    ) -> Result<MergeStatement, RecordValidationError> {
        if let Some(column) = record.columns().find(|c| spec.get_column(c).is_none()) {
            return Err(RecordValidationError::UnknownColumn {
                index,
                column: column.to_string(),
            });
        }

        for key in &spec.key {
            if !record.contains(key) {
                return Err(RecordValidationError::MissingKeyColumn {
                    index,
                    column: key.clone(),
                });
            }
        }

        let mut assignments = Vec::with_capacity(record.len());
        for column in &spec.columns {
            let Some(value) = record.get(&column.name) else {
                continue;
            };
            let bound = bind_value(index, &column.name, column.column_type, value)?;
            if bound.is_null() && spec.is_key_column(&column.name) {
                return Err(RecordValidationError::NullKeyColumn {
                    index,
                    column: column.name.clone(),
                });
            }
            assignments.push((column.name.clone(), bound));
        }

        Ok(MergeStatement::new(
            spec.table.clone(),
            spec.key.clone(),
            assignments,
        ))
    }

    /// Merge every record of `snapshot` into the table for `spec`.
    pub async fn upsert<W: Warehouse + ?Sized>(
        &self,
        conn: &mut W,
        spec: &TableSpec,
        snapshot: &Snapshot,
    ) -> Result<UpsertReport, UpsertAborted> {
        let mut report = UpsertReport::default();

        for (index, record) in snapshot.records.iter().enumerate() {
            let merge = match self.merge_statement(spec, index, record) {
                Ok(merge) => merge,
                Err(e) => {
                    tracing::warn!("Skipping record in {}: {}", spec.table, e);
                    report.record_failure(e.into());
                    continue;
                }
            };

            let statement = Statement::Merge(merge);
            tracing::debug!("{}", statement);
            match conn.execute(&statement).await {
                Ok(effect) => {
                    report.succeeded += 1;
                    report.rows_affected += effect.rows_affected;
                }
                Err(e) if e.is_connection() => {
                    tracing::error!("Connection lost while merging into {}: {}", spec.table, e);
                    return Err(UpsertAborted { report, error: e });
                }
                Err(e) => {
                    tracing::warn!("Record {} of {} failed: {}", index, spec.table, e);
                    report.record_failure(RecordError::Statement { index, source: e });
                }
            }
        }

        Ok(report)
    }
}

/// Type a snapshot value for its declared column.
fn bind_value(
    index: usize,
    column: &str,
    column_type: ColumnType,
    value: &ScalarValue,
) -> Result<SqlValue, RecordValidationError> {
    match (column_type, value) {
        (ty, ScalarValue::Null) => Ok(SqlValue::Null(ty)),
        (ColumnType::String, ScalarValue::Text(s)) => Ok(SqlValue::Text(s.clone())),
        (ColumnType::String, ScalarValue::Bool(b)) => Ok(SqlValue::Text(b.to_string())),
        (ColumnType::Boolean, ScalarValue::Bool(b)) => Ok(SqlValue::Bool(*b)),
        (ColumnType::Boolean, ScalarValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(SqlValue::Null(ColumnType::Boolean))
            } else if trimmed.eq_ignore_ascii_case("true") {
                Ok(SqlValue::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(SqlValue::Bool(false))
            } else {
                Err(RecordValidationError::InvalidValue {
                    index,
                    column: column.to_string(),
                    expected: ColumnType::Boolean,
                    found: s.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::ColumnDefinition;

    fn origenes() -> TableSpec {
        TableSpec::new("origenes", "origenes")
            .column(ColumnDefinition::new("id_origen", ColumnType::String))
            .column(ColumnDefinition::new("nombre_origen", ColumnType::String))
            .column(ColumnDefinition::new("activo", ColumnType::Boolean))
            .column(ColumnDefinition::new("id_caso_uso", ColumnType::String))
            .key(["id_origen"])
    }

    #[test]
    fn test_columns_follow_declaration_order() {
        let record = Record::new()
            .with("id_caso_uso", "c1")
            .with("activo", "true")
            .with("id_origen", "o1");
        let merge = UpsertEngine::new()
            .merge_statement(&origenes(), 0, &record)
            .unwrap();

        assert_eq!(merge.columns, vec!["id_origen", "activo", "id_caso_uso"]);
        assert_eq!(merge.value_of("activo"), Some(&SqlValue::Bool(true)));
        assert_eq!(merge.update_columns().collect::<Vec<_>>(), vec!["activo", "id_caso_uso"]);
    }

    #[test]
    fn test_boolean_text_coercion() {
        let bind = |v: &str| bind_value(0, "activo", ColumnType::Boolean, &ScalarValue::text(v));
        assert_eq!(bind(" TRUE ").unwrap(), SqlValue::Bool(true));
        assert_eq!(bind("False").unwrap(), SqlValue::Bool(false));
        assert_eq!(bind("").unwrap(), SqlValue::Null(ColumnType::Boolean));
        assert!(matches!(
            bind("yes"),
            Err(RecordValidationError::InvalidValue { ref found, .. }) if found == "yes"
        ));
    }

    #[test]
    fn test_string_column_keeps_text_and_renders_bools() {
        let spec = origenes();
        let record = Record::new()
            .with("id_origen", "o1")
            .with("nombre_origen", true);
        let merge = UpsertEngine::new().merge_statement(&spec, 0, &record).unwrap();
        assert_eq!(
            merge.value_of("nombre_origen"),
            Some(&SqlValue::Text("true".to_string()))
        );
    }

    #[test]
    fn test_empty_and_null_are_present_values() {
        let record = Record::new()
            .with("id_origen", "o1")
            .with("nombre_origen", "")
            .with("activo", ScalarValue::Null);
        let merge = UpsertEngine::new()
            .merge_statement(&origenes(), 0, &record)
            .unwrap();
        assert_eq!(merge.value_of("nombre_origen"), Some(&SqlValue::Text(String::new())));
        assert_eq!(merge.value_of("activo"), Some(&SqlValue::Null(ColumnType::Boolean)));
        assert_eq!(merge.value_of("id_caso_uso"), None);
    }

    #[test]
    fn test_key_validation() {
        let engine = UpsertEngine::new();
        let spec = origenes();

        let missing = Record::new().with("nombre_origen", "X");
        assert_eq!(
            engine.merge_statement(&spec, 3, &missing).unwrap_err(),
            RecordValidationError::MissingKeyColumn {
                index: 3,
                column: "id_origen".to_string()
            }
        );

        let null = Record::new().with("id_origen", ScalarValue::Null);
        assert!(matches!(
            engine.merge_statement(&spec, 0, &null),
            Err(RecordValidationError::NullKeyColumn { .. })
        ));

        let unknown = Record::new().with("id_origen", "o1").with("extra", "x");
        assert!(matches!(
            engine.merge_statement(&spec, 0, &unknown),
            Err(RecordValidationError::UnknownColumn { ref column, .. }) if column == "extra"
        ));
    }

    #[test]
    fn test_report_keeps_first_errors() {
        let mut report = UpsertReport::default();
        report.record_failure(
            RecordValidationError::MissingKeyColumn {
                index: 1,
                column: "id_origen".into(),
            }
            .into(),
        );
        report.record_failure(
            RecordValidationError::MissingKeyColumn {
                index: 2,
                column: "id_origen".into(),
            }
            .into(),
        );
        report.record_failure(RecordError::Statement {
            index: 4,
            source: WarehouseError::statement("MERGE INTO origenes ON (id_origen)", "boom"),
        });

        assert_eq!(report.validation_failed, 2);
        assert_eq!(report.statement_failed, 1);
        assert_eq!(report.failed(), 3);
        assert_eq!(report.first_validation_error.as_ref().map(|e| e.index()), Some(1));
        assert!(report
            .first_statement_error
            .as_deref()
            .is_some_and(|e| e.starts_with("record 4: statement failed: boom")));
    }
}
