//! Warehouse sink trait abstraction.
//!
//! This crate defines the connection contract the metadata-sync engine runs
//! against, independent of any particular warehouse:
//!
//! - [`Connector`] opens exactly one [`Warehouse`] session per sync run
//! - [`Warehouse`] executes [`Statement`]s and is closed once at the end
//! - [`Dialect`] renders statements into SQL text plus positional parameters,
//!   so record values never appear inside the SQL text
//!
//! Backends live in their own crates (`postgresql-sink`, `snowflake-sink`).
//! [`MemoryWarehouse`] implements the same statement semantics in process.

mod dialect;
mod error;
mod memory;
mod statement;
mod timeout;
mod traits;
mod value;

pub use dialect::{Dialect, RenderedStatement};
pub use error::{BoxError, WarehouseError};
pub use memory::{MemoryConnector, MemoryRow, MemoryWarehouse};
pub use statement::{CreateMode, MergeStatement, RowEffect, Statement};
pub use timeout::{TimeoutConnector, TimeoutWarehouse};
pub use traits::{Connector, Warehouse};
pub use value::SqlValue;
