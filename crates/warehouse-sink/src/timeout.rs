//! Per-statement timeout.
//!
//! A statement that does not finish in time is reported as a statement
//! error, exactly like a rejected statement.

use crate::error::WarehouseError;
use crate::statement::{RowEffect, Statement};
use crate::traits::{Connector, Warehouse};
use std::time::Duration;

/// Wraps a session and bounds every `execute` call.
pub struct TimeoutWarehouse<W> {
    inner: W,
    timeout: Option<Duration>,
}

impl<W: Warehouse> TimeoutWarehouse<W> {
    /// Wrap `inner`; `None` disables the bound.
    pub fn new(inner: W, timeout: Option<Duration>) -> Self {
        Self { inner, timeout }
    }

    /// The wrapped session.
    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<W: Warehouse> Warehouse for TimeoutWarehouse<W> {
    async fn execute(&mut self, statement: &Statement) -> Result<RowEffect, WarehouseError> {
        let Some(limit) = self.timeout else {
            return self.inner.execute(statement).await;
        };

        match tokio::time::timeout(limit, self.inner.execute(statement)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Statement timed out after {:?}: {}", limit, statement);
                Err(WarehouseError::statement(
                    statement.to_string(),
                    format!("timed out after {}s", limit.as_secs_f64()),
                ))
            }
        }
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}

/// Opens sessions wrapped in [`TimeoutWarehouse`].
pub struct TimeoutConnector<C> {
    inner: C,
    timeout: Option<Duration>,
}

impl<C: Connector> TimeoutConnector<C> {
    /// Wrap `inner`; `None` disables the bound.
    pub fn new(inner: C, timeout: Option<Duration>) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl<C: Connector> Connector for TimeoutConnector<C> {
    type Connection = TimeoutWarehouse<C::Connection>;

    async fn open(&self) -> Result<Self::Connection, WarehouseError> {
        let conn = self.inner.open().await?;
        Ok(TimeoutWarehouse::new(conn, self.timeout))
    }
}
