//! JSON snapshot source for metadata-sync
//!
//! This crate resolves a table's source identifier to a concrete resource
//! (a local file or an HTTP URL), reads it, and decodes it into a
//! [`Snapshot`](sync_core::Snapshot).
//!
//! A snapshot resource holds a JSON array of flat objects; each object's
//! keys become column names:
//!
//! ```json
//! [
//!   {"id_origen": "o1", "nombre_origen": "X", "activo": "true", "id_caso_uso": "c1"}
//! ]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use metadata_sync_json_source::{FileSnapshotLoader, SnapshotLoader, SnapshotLocation};
//!
//! let loader = FileSnapshotLoader::new(SnapshotLocation::parse("/data/snapshots/"));
//! let snapshot = loader.load("origenes").await?;
//! ```

mod decode;
mod error;
mod loader;
mod location;

pub use decode::decode_snapshot;
pub use error::SourceLoadError;
pub use loader::{FileSnapshotLoader, SnapshotLoader};
pub use location::{ResolvedSnapshot, SnapshotLocation, SNAPSHOT_EXTENSION};
