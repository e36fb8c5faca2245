//! Schema reconciliation.
//!
//! Issues one DDL statement per table so the target exists with its
//! declared shape before any record is merged into it.

use sync_core::TableSpec;
use warehouse_sink::{CreateMode, Statement, Warehouse, WarehouseError};

/// How existing tables are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SchemaPolicy {
    /// Create the table only when it does not exist yet
    #[default]
    #[value(name = "create-if-absent")]
    CreateIfAbsent,
    /// Drop and recreate every table (existing rows are lost)
    #[value(name = "replace")]
    Replace,
}

impl SchemaPolicy {
    fn create_mode(self) -> CreateMode {
        match self {
            SchemaPolicy::CreateIfAbsent => CreateMode::IfNotExists,
            SchemaPolicy::Replace => CreateMode::Replace,
        }
    }
}

impl std::fmt::Display for SchemaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaPolicy::CreateIfAbsent => write!(f, "create-if-absent"),
            SchemaPolicy::Replace => write!(f, "replace"),
        }
    }
}

/// Schema reconciliation failure.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The warehouse rejected the DDL; only this table is affected
    #[error("schema for table '{table}' was rejected: {source}")]
    Rejected {
        table: String,
        #[source]
        source: WarehouseError,
    },

    /// The session failed while reconciling; the run cannot continue
    #[error("connection lost while reconciling table '{table}': {source}")]
    Connection {
        table: String,
        #[source]
        source: WarehouseError,
    },
}

impl SchemaError {
    /// Whether the error ends the run.
    pub fn is_connection(&self) -> bool {
        matches!(self, SchemaError::Connection { .. })
    }

    /// The underlying warehouse error.
    pub fn into_warehouse_error(self) -> WarehouseError {
        match self {
            SchemaError::Rejected { source, .. } | SchemaError::Connection { source, .. } => source,
        }
    }
}

/// Ensures target tables exist with their declared shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaReconciler {
    policy: SchemaPolicy,
}

impl SchemaReconciler {
    pub fn new(policy: SchemaPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    /// The DDL statement issued for `spec` under this policy.
    pub fn statement(&self, spec: &TableSpec) -> Statement {
        Statement::CreateTable {
            spec: spec.clone(),
            mode: self.policy.create_mode(),
        }
    }

    /// Create or replace the table for `spec`.
    pub async fn ensure_table<W: Warehouse + ?Sized>(
        &self,
        conn: &mut W,
        spec: &TableSpec,
    ) -> Result<(), SchemaError> {
        let statement = self.statement(spec);
        tracing::debug!("Reconciling table {} ({})", spec.table, self.policy);

        match conn.execute(&statement).await {
            Ok(_) => {
                tracing::info!("Table {} verified/created", spec.table);
                Ok(())
            }
            Err(e) if e.is_connection() => Err(SchemaError::Connection {
                table: spec.table.clone(),
                source: e,
            }),
            Err(e) => Err(SchemaError::Rejected {
                table: spec.table.clone(),
                source: e,
            }),
        }
    }
}
