//! Connection traits.
//!
//! The engine is generic over these traits; the CLI entry point picks a
//! backend once and everything after that is monomorphized for it.

use crate::error::WarehouseError;
use crate::statement::{RowEffect, Statement};

/// One live warehouse session.
///
/// ```ignore
/// pub async fn apply<W: Warehouse>(conn: &mut W, statement: &Statement) -> Result<()> {
///     conn.execute(statement).await?;
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait Warehouse: Send {
    /// Execute one statement as its own unit of work.
    async fn execute(&mut self, statement: &Statement) -> Result<RowEffect, WarehouseError>;

    /// Release the session. Idempotent and infallible: failures while
    /// closing are logged, never returned.
    async fn close(&mut self);
}

/// Opens warehouse sessions.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Session type produced by this connector.
    type Connection: Warehouse;

    /// Establish a session; authentication and network failures are
    /// connection errors.
    async fn open(&self) -> Result<Self::Connection, WarehouseError>;
}
