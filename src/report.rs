//! Run report

use crate::upsert::UpsertReport;
use serde::Serialize;

/// What happened to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Schema reconciled and every record processed (individual records may have failed)
    Synced,
    /// The snapshot could not be loaded; the table was not touched
    SourceFailed,
    /// The DDL was rejected; no record was merged
    SchemaFailed,
    /// The connection failed while this table was in progress
    Aborted,
    /// The run ended before reaching this table
    NotStarted,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TableStatus::Synced => "synced",
            TableStatus::SourceFailed => "source failed",
            TableStatus::SchemaFailed => "schema failed",
            TableStatus::Aborted => "aborted",
            TableStatus::NotStarted => "not started",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub source: String,
    pub status: TableStatus,
    /// Whether the DDL for this table succeeded
    pub schema_ok: bool,
    pub upsert: UpsertReport,
    /// Source, schema, or connection error that stopped this table
    pub error: Option<String>,
}

impl TableReport {
    pub(crate) fn new(table: &str, source: &str, status: TableStatus) -> Self {
        Self {
            table: table.to_string(),
            source: source.to_string(),
            status,
            schema_ok: false,
            upsert: UpsertReport::default(),
            error: None,
        }
    }

    /// Synced with no failed record.
    pub fn is_clean(&self) -> bool {
        self.status == TableStatus::Synced && self.upsert.is_clean()
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every table was processed
    Done,
    /// A connection-level failure ended the run early
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// One entry per registry table, in registry order
    pub tables: Vec<TableReport>,
}

impl RunReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn is_done(&self) -> bool {
        self.outcome == RunOutcome::Done
    }

    /// Done, and every table synced without a failed record.
    pub fn is_clean(&self) -> bool {
        self.is_done() && self.tables.iter().all(TableReport::is_clean)
    }

    pub fn records_succeeded(&self) -> usize {
        self.tables.iter().map(|t| t.upsert.succeeded).sum()
    }

    pub fn records_failed(&self) -> usize {
        self.tables.iter().map(|t| t.upsert.failed()).sum()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for t in &self.tables {
            write!(
                f,
                "{:<16} {:<14} schema={:<3} ok={} validation_failed={} statement_failed={} rows={}",
                t.table,
                t.status.to_string(),
                if t.schema_ok { "ok" } else { "-" },
                t.upsert.succeeded,
                t.upsert.validation_failed,
                t.upsert.statement_failed,
                t.upsert.rows_affected
            )?;
            writeln!(f)?;
            if let Some(error) = &t.error {
                writeln!(f, "    error: {error}")?;
            }
            if let Some(error) = &t.upsert.first_validation_error {
                writeln!(f, "    first validation error: {error}")?;
            }
            if let Some(error) = &t.upsert.first_statement_error {
                writeln!(f, "    first statement error: {error}")?;
            }
        }
        match &self.outcome {
            RunOutcome::Done => write!(
                f,
                "done: {} records merged, {} failed",
                self.records_succeeded(),
                self.records_failed()
            ),
            RunOutcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}
