//! Core types for the metadata-sync framework.
//!
//! This crate provides the foundational types shared by every other crate
//! in the workspace:
//!
//! - [`TableSpec`] - Declaration of one target table (columns, key, foreign keys, source)
//! - [`Registry`] - Ordered, validated collection of table declarations
//! - [`Record`] / [`Snapshot`] - Decoded snapshot rows keyed by column name
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── json-source      (decodes snapshot files into Snapshot)
//!    ├─── warehouse-sink   (renders TableSpec into DDL, Records into MERGE)
//!    │      ├─── postgresql-sink
//!    │      └─── snowflake-sink
//!    └─── metadata-sync    (schema reconciler, upsert engine, orchestrator)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{ColumnDefinition, ColumnType, Registry, TableSpec};
//!
//! let casos = TableSpec::new("casos_uso", "casos_uso")
//!     .column(ColumnDefinition::new("id_caso_uso", ColumnType::String))
//!     .column(ColumnDefinition::new("activo", ColumnType::Boolean))
//!     .key(["id_caso_uso"]);
//!
//! let registry = Registry::new(vec![casos]).unwrap();
//! assert_eq!(registry.len(), 1);
//! ```

pub mod registry;
pub mod schema;
pub mod values;

// Re-exports for convenience
pub use registry::{Registry, RegistryError};
pub use schema::{is_valid_identifier, ColumnDefinition, ColumnType, ForeignKey, TableSpec};
pub use values::{Record, ScalarValue, Snapshot};
