//! PostgreSQL backend.
//!
//! Requires PostgreSQL 15 or newer for `MERGE`. Each statement runs in
//! autocommit mode; record values are always sent as bound parameters.

mod config;
mod connect;
mod params;

pub use config::PostgresConfig;
pub use connect::{PostgresConnector, PostgresWarehouse};
pub use params::bind_params;
