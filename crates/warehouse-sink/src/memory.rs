//! In-process warehouse.
//!
//! Executes [`Statement`]s directly against in-memory tables with the same
//! semantics the SQL backends provide: CREATE fails when a foreign-key target
//! does not exist, MERGE matches on the conjunction of all key columns, and
//! NULL never matches. Inserts and updates are checked against every foreign
//! key whose columns are all non-null. Used for dry runs and by the test suite.

use crate::error::WarehouseError;
use crate::statement::{CreateMode, MergeStatement, RowEffect, Statement};
use crate::traits::{Connector, Warehouse};
use crate::value::SqlValue;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::TableSpec;

/// One stored row: column name to value.
pub type MemoryRow = BTreeMap<String, SqlValue>;

#[derive(Debug)]
struct MemoryTable {
    spec: TableSpec,
    rows: Vec<MemoryRow>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    executed: AtomicUsize,
}

/// Opens sessions onto one shared in-memory database.
///
/// Cloning the connector shares the database, so a test can keep a handle
/// and inspect the tables after a run has closed its session.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// Create a connector over an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session without going through the [`Connector`] trait.
    pub fn connect(&self) -> MemoryWarehouse {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        MemoryWarehouse {
            shared: Arc::clone(&self.shared),
            closed: false,
        }
    }

    /// Rows of a table in insertion order, `None` if the table does not exist.
    pub fn rows(&self, table: &str) -> Option<Vec<MemoryRow>> {
        self.lock().get(table).map(|t| t.rows.clone())
    }

    /// Whether a table exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.lock().contains_key(table)
    }

    /// Names of existing tables.
    pub fn table_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of sessions opened.
    pub fn connections_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed.
    pub fn connections_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of statements executed successfully.
    pub fn statements_executed(&self) -> usize {
        self.shared.executed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryTable>> {
        lock_tables(&self.shared)
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryWarehouse;

    async fn open(&self) -> Result<Self::Connection, WarehouseError> {
        Ok(self.connect())
    }
}

/// Session onto a [`MemoryConnector`] database.
#[derive(Debug)]
pub struct MemoryWarehouse {
    shared: Arc<Shared>,
    closed: bool,
}

#[async_trait::async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&mut self, statement: &Statement) -> Result<RowEffect, WarehouseError> {
        if self.closed {
            return Err(WarehouseError::connection("session is closed"));
        }

        let mut tables = lock_tables(&self.shared);
        let effect = match statement {
            Statement::CreateTable { spec, mode } => create_table(&mut tables, spec, *mode),
            Statement::Merge(merge) => apply_merge(&mut tables, merge),
        }
        .map_err(|message| {
            tracing::debug!("In-memory statement rejected: {} ({})", statement, message);
            WarehouseError::statement(statement.to_string(), message)
        })?;

        self.shared.executed.fetch_add(1, Ordering::SeqCst);
        Ok(effect)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn lock_tables(shared: &Shared) -> MutexGuard<'_, BTreeMap<String, MemoryTable>> {
    // A panic while holding the lock leaves the maps structurally intact
    shared
        .tables
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn create_table(
    tables: &mut BTreeMap<String, MemoryTable>,
    spec: &TableSpec,
    mode: CreateMode,
) -> Result<RowEffect, String> {
    if mode == CreateMode::IfNotExists && tables.contains_key(&spec.table) {
        return Ok(RowEffect::default());
    }

    for fk in &spec.foreign_keys {
        let target = if fk.references == spec.table {
            Some(spec)
        } else {
            tables.get(&fk.references).map(|t| &t.spec)
        };
        let Some(target) = target else {
            return Err(format!(
                "table '{}' referenced by '{}' does not exist",
                fk.references, spec.table
            ));
        };
        if let Some(column) = fk
            .referenced_columns
            .iter()
            .find(|c| target.get_column(c).is_none())
        {
            return Err(format!(
                "column '{}' does not exist in referenced table '{}'",
                column, fk.references
            ));
        }
    }

    tables.insert(
        spec.table.clone(),
        MemoryTable {
            spec: spec.clone(),
            rows: Vec::new(),
        },
    );
    Ok(RowEffect::default())
}

fn apply_merge(
    tables: &mut BTreeMap<String, MemoryTable>,
    merge: &MergeStatement,
) -> Result<RowEffect, String> {
    let table = tables
        .get(&merge.table)
        .ok_or_else(|| format!("table '{}' does not exist", merge.table))?;

    for (column, value) in merge.columns.iter().zip(&merge.values) {
        let declared = table
            .spec
            .get_column(column)
            .ok_or_else(|| format!("invalid identifier '{column}'"))?;
        let required = !declared.nullable || table.spec.is_key_column(column);
        if required && value.is_null() {
            return Err(format!("NULL result in a non-nullable column '{column}'"));
        }
        if !value.is_null() && value.column_type() != declared.column_type {
            return Err(format!(
                "column '{}' expects {}, got {}",
                column,
                declared.column_type,
                value.column_type()
            ));
        }
    }

    let key_values: Vec<&SqlValue> = merge
        .key
        .iter()
        .map(|k| {
            merge
                .value_of(k)
                .ok_or_else(|| format!("key column '{k}' missing from merge source"))
        })
        .collect::<Result<_, _>>()?;

    let matched: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            merge
                .key
                .iter()
                .zip(&key_values)
                .all(|(k, v)| row.get(k).is_some_and(|existing| existing.sql_eq(v)))
        })
        .map(|(idx, _)| idx)
        .collect();

    // Resulting rows, each tagged with the position it replaces
    let changes: Vec<(Option<usize>, MemoryRow)> = if matched.is_empty() {
        vec![(None, new_row(&table.spec, merge)?)]
    } else {
        matched
            .iter()
            .map(|&idx| {
                let mut row = table.rows[idx].clone();
                for column in merge.update_columns() {
                    if let Some(value) = merge.value_of(column) {
                        row.insert(column.to_string(), value.clone());
                    }
                }
                (Some(idx), row)
            })
            .collect()
    };

    for (_, row) in &changes {
        check_foreign_keys(tables, &table.spec, row)?;
    }

    let table = tables
        .get_mut(&merge.table)
        .ok_or_else(|| format!("table '{}' does not exist", merge.table))?;

    if matched.is_empty() {
        table.rows.extend(changes.into_iter().map(|(_, row)| row));
        return Ok(RowEffect::rows(1));
    }

    for (idx, row) in changes {
        if let Some(idx) = idx {
            table.rows[idx] = row;
        }
    }

    // A matched record with no non-key columns changes nothing
    let updated = if merge.update_columns().next().is_some() {
        matched.len() as u64
    } else {
        0
    };
    Ok(RowEffect::rows(updated))
}

fn new_row(spec: &TableSpec, merge: &MergeStatement) -> Result<MemoryRow, String> {
    let mut row = MemoryRow::new();
    for column in &spec.columns {
        let value = merge
            .value_of(&column.name)
            .cloned()
            .unwrap_or(SqlValue::Null(column.column_type));
        let required = !column.nullable || spec.is_key_column(&column.name);
        if required && value.is_null() {
            return Err(format!(
                "NULL result in a non-nullable column '{}'",
                column.name
            ));
        }
        row.insert(column.name.clone(), value);
    }
    Ok(row)
}

/// Every foreign key whose columns are all non-null must find a referenced row.
fn check_foreign_keys(
    tables: &BTreeMap<String, MemoryTable>,
    spec: &TableSpec,
    row: &MemoryRow,
) -> Result<(), String> {
    for fk in &spec.foreign_keys {
        let values: Vec<&SqlValue> = fk.columns.iter().filter_map(|c| row.get(c)).collect();
        if values.len() != fk.columns.len() || values.iter().any(|v| v.is_null()) {
            continue;
        }

        let references = |candidate: &MemoryRow| {
            fk.referenced_columns
                .iter()
                .zip(&values)
                .all(|(c, v)| candidate.get(c).is_some_and(|existing| existing.sql_eq(v)))
        };
        let self_reference = fk.references == spec.table && references(row);
        let found = self_reference
            || tables
                .get(&fk.references)
                .is_some_and(|t| t.rows.iter().any(|r| references(r)));
        if !found {
            return Err(format!(
                "insert or update on table '{}' violates foreign key ({}) referencing '{}'",
                spec.table,
                fk.columns.join(", "),
                fk.references
            ));
        }
    }
    Ok(())
}
