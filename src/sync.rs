//! Sync orchestration.
//!
//! Drives the registry in declaration order over a single warehouse
//! session:
//!
//! 1. Open one connection (a failure here ends the run before any table)
//! 2. For each table: load its snapshot, reconcile the schema, merge records
//! 3. Close the connection, whatever happened in step 2
//!
//! A missing snapshot skips its table and a rejected DDL skips its records;
//! both are recorded and the run moves on. A connection-level error aborts
//! the remaining tables.

use crate::report::{RunOutcome, RunReport, TableReport, TableStatus};
use crate::schema::SchemaReconciler;
use crate::upsert::UpsertEngine;
use metadata_sync_json_source::SnapshotLoader;
use sync_core::{Registry, TableSpec};
use warehouse_sink::{Connector, Warehouse, WarehouseError};

/// Runs a registry against one warehouse.
pub struct SyncOrchestrator<L> {
    registry: Registry,
    loader: L,
    reconciler: SchemaReconciler,
    engine: UpsertEngine,
}

impl<L: SnapshotLoader> SyncOrchestrator<L> {
    pub fn new(registry: Registry, loader: L, reconciler: SchemaReconciler) -> Self {
        Self {
            registry,
            loader,
            reconciler,
            engine: UpsertEngine::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Execute one run.
    ///
    /// The connection is closed exactly once if it was opened; the returned
    /// report has one entry per registry table.
    pub async fn run<C: Connector>(&self, connector: &C) -> RunReport {
        tracing::info!(
            "Starting metadata sync of {} tables (schema policy: {})",
            self.registry.len(),
            self.reconciler.policy()
        );

        let mut conn = match connector.open().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Failed to open warehouse connection: {}", e);
                return RunReport {
                    outcome: RunOutcome::Failed {
                        error: e.to_string(),
                    },
                    tables: self.not_started(0),
                };
            }
        };

        let mut tables = Vec::with_capacity(self.registry.len());
        let result = self.sync_tables(&mut conn, &mut tables).await;
        conn.close().await;

        let outcome = match result {
            Ok(()) => RunOutcome::Done,
            Err(e) => {
                tables.extend(self.not_started(tables.len()));
                RunOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let report = RunReport { outcome, tables };
        tracing::info!(
            "Metadata sync finished: {} records merged, {} failed",
            report.records_succeeded(),
            report.records_failed()
        );
        report
    }

    async fn sync_tables<W: Warehouse>(
        &self,
        conn: &mut W,
        tables: &mut Vec<TableReport>,
    ) -> Result<(), WarehouseError> {
        for spec in &self.registry {
            let (report, fatal) = self.sync_table(conn, spec).await;
            tables.push(report);
            if let Some(e) = fatal {
                return Err(e);
            }
        }
        Ok(())
    }

    /// Process one table; the second value is set when the run must stop.
    async fn sync_table<W: Warehouse>(
        &self,
        conn: &mut W,
        spec: &TableSpec,
    ) -> (TableReport, Option<WarehouseError>) {
        let mut report = TableReport::new(&spec.table, &spec.source, TableStatus::Synced);

        let snapshot = match self.loader.load(&spec.source).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Skipping table {}: {}", spec.table, e);
                report.status = TableStatus::SourceFailed;
                report.error = Some(e.to_string());
                return (report, None);
            }
        };

        if let Err(e) = self.reconciler.ensure_table(conn, spec).await {
            report.error = Some(e.to_string());
            if e.is_connection() {
                tracing::error!("{}", e);
                report.status = TableStatus::Aborted;
                return (report, Some(e.into_warehouse_error()));
            }
            tracing::warn!("{}", e);
            report.status = TableStatus::SchemaFailed;
            return (report, None);
        }
        report.schema_ok = true;

        match self.engine.upsert(conn, spec, &snapshot).await {
            Ok(upsert) => {
                tracing::info!(
                    "Table {}: {} of {} records merged ({} rows affected)",
                    spec.table,
                    upsert.succeeded,
                    snapshot.len(),
                    upsert.rows_affected
                );
                report.upsert = upsert;
                (report, None)
            }
            Err(aborted) => {
                report.status = TableStatus::Aborted;
                report.error = Some(aborted.error.to_string());
                report.upsert = aborted.report;
                (report, Some(aborted.error))
            }
        }
    }

    fn not_started(&self, from: usize) -> Vec<TableReport> {
        self.registry
            .iter()
            .skip(from)
            .map(|spec| TableReport::new(&spec.table, &spec.source, TableStatus::NotStarted))
            .collect()
    }
}
