//! Metadata Sync Library
//!
//! Reconciles JSON metadata snapshots with warehouse tables: each declared
//! table is created if needed and then every snapshot record is merged into
//! it by key. Rows are inserted or updated, never deleted.
//!
//! # Components
//!
//! - [`sync_core::Registry`] - ordered table declarations (referenced tables first)
//! - [`schema::SchemaReconciler`] - one DDL statement per table
//! - [`upsert::UpsertEngine`] - one parameterized MERGE per record
//! - [`sync::SyncOrchestrator`] - drives the registry over a single connection
//!
//! Warehouses implement [`warehouse_sink::Connector`]; the CLI ships
//! Snowflake (`snowflake_sink`) and PostgreSQL (`postgresql_sink`) backends
//! plus an in-memory warehouse for dry runs.
//!
//! # CLI Usage
//!
//! ```bash
//! # Sync ./snapshots/{casos_uso,origenes,orquestadores}.json into Snowflake
//! metadata-sync sync snowflake --snapshots ./snapshots
//!
//! # Same, into PostgreSQL, recreating the tables first
//! metadata-sync sync postgresql --snapshots ./snapshots --schema-policy replace
//!
//! # Show the registry and the DDL it renders
//! metadata-sync registry --dialect postgresql
//! ```

pub mod config;
pub mod report;
pub mod schema;
pub mod sync;
pub mod upsert;

pub use config::{ConfigError, SyncOpts, WarehouseConfig, WarehouseKind, WarehouseOpts};
pub use report::{RunOutcome, RunReport, TableReport, TableStatus};
pub use schema::{SchemaError, SchemaPolicy, SchemaReconciler};
pub use sync::SyncOrchestrator;
pub use upsert::{RecordError, RecordValidationError, UpsertAborted, UpsertEngine, UpsertReport};

// Re-export member crates for convenience
pub use metadata_sync_json_source as json_source;
pub use postgresql_sink;
pub use snowflake_sink;
pub use sync_core;
pub use warehouse_sink;
