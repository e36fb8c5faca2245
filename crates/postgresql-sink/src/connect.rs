use crate::config::PostgresConfig;
use crate::params::bind_params;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use warehouse_sink::{Connector, Dialect, RowEffect, Statement, Warehouse, WarehouseError};

/// Default number of connection retry attempts
const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
/// Default delay between retry attempts in seconds
const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Opens PostgreSQL sessions.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
    max_retries: u32,
    retry_delay: Duration,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            max_retries: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }

    /// Override the retry policy used while establishing the session.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    async fn try_connect(&self) -> Result<PostgresWarehouse, WarehouseError> {
        let target = self.config.target();
        let (client, connection) = self
            .config
            .postgres_config
            .connect(NoTls)
            .await
            .map_err(|e| {
                WarehouseError::connection_with(
                    format!("PostgreSQL connection to '{target}' failed"),
                    e,
                )
            })?;

        // Spawn connection handler
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {e}");
            }
        });

        let mut warehouse = PostgresWarehouse {
            client: Some(client),
            handle: Some(handle),
        };

        if let Some(sql) = self.config.search_path_sql() {
            if let Err(e) = warehouse.batch(&sql).await {
                warehouse.close().await;
                return Err(WarehouseError::connection(format!(
                    "failed to select schema on '{target}': {e}"
                )));
            }
        }

        Ok(warehouse)
    }
}

#[async_trait::async_trait]
impl Connector for PostgresConnector {
    type Connection = PostgresWarehouse;

    async fn open(&self) -> Result<Self::Connection, WarehouseError> {
        let target = self.config.target();
        tracing::debug!("Connecting to PostgreSQL at {}", target);

        let mut attempt = 1;
        loop {
            match self.try_connect().await {
                Ok(warehouse) => {
                    if attempt > 1 {
                        tracing::info!(
                            "Successfully connected to PostgreSQL after {} attempts",
                            attempt
                        );
                    }
                    return Ok(warehouse);
                }
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        "Failed to connect to PostgreSQL at '{}' (attempt {}/{}): {}. Retrying in {}s...",
                        target,
                        attempt,
                        self.max_retries,
                        e,
                        self.retry_delay.as_secs()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to PostgreSQL at '{}' after {} attempts",
                        target,
                        attempt
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Live PostgreSQL session.
#[derive(Debug)]
pub struct PostgresWarehouse {
    client: Option<Client>,
    handle: Option<JoinHandle<()>>,
}

impl PostgresWarehouse {
    fn client(&self) -> Result<&Client, WarehouseError> {
        self.client
            .as_ref()
            .ok_or_else(|| WarehouseError::connection("session is closed"))
    }

    async fn batch(&self, sql: &str) -> Result<(), WarehouseError> {
        self.client()?
            .batch_execute(sql)
            .await
            .map_err(|e| classify(sql, e))
    }
}

#[async_trait::async_trait]
impl Warehouse for PostgresWarehouse {
    async fn execute(&mut self, statement: &Statement) -> Result<RowEffect, WarehouseError> {
        let rendered = Dialect::PostgreSQL.render(statement);
        tracing::trace!("Executing: {}", rendered.sql);

        if rendered.params.is_empty() {
            // DDL; the replace form is two statements in one batch
            self.batch(&rendered.sql).await?;
            return Ok(RowEffect::default());
        }

        let params = bind_params(&rendered.params);
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self
            .client()?
            .execute(rendered.sql.as_str(), &refs)
            .await
            .map_err(|e| classify(&statement.to_string(), e))?;
        Ok(RowEffect::rows(rows))
    }

    async fn close(&mut self) {
        // Dropping the client ends the connection task
        if self.client.take().is_none() {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("PostgreSQL connection task ended abnormally: {e}");
            }
        }
        tracing::debug!("PostgreSQL session closed");
    }
}

/// Split driver errors into session loss and statement rejection.
fn classify(statement: &str, e: tokio_postgres::Error) -> WarehouseError {
    if e.is_closed() {
        return WarehouseError::connection_with("PostgreSQL connection closed", e);
    }
    if let Some(code) = e.code() {
        let message = match e.as_db_error() {
            Some(db) => format!("{} ({})", db.message(), code.code()),
            None => code.code().to_string(),
        };
        return WarehouseError::statement_with(statement, message, e);
    }
    let io_failure = std::error::Error::source(&e)
        .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some());
    if io_failure {
        WarehouseError::connection_with("PostgreSQL I/O error", e)
    } else {
        WarehouseError::statement_with(statement, e.to_string(), e)
    }
}
