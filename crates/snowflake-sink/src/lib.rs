//! Snowflake backend over the SQL API v2.
//!
//! Every statement is a `POST /api/v2/statements` request authenticated
//! with a bearer token. Record values travel in the request's `bindings`
//! object and are never spliced into the SQL text.

mod api;
mod config;
mod connect;

pub use api::{bindings, Binding, DmlStats, StatementRequest, StatementResponse};
pub use config::{SnowflakeConfig, TokenType};
pub use connect::{SnowflakeConnector, SnowflakeWarehouse};
