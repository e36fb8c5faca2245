use crate::api::{bindings, StatementRequest, StatementResponse};
use crate::config::SnowflakeConfig;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use warehouse_sink::{
    Connector, Dialect, RenderedStatement, RowEffect, Statement, Warehouse, WarehouseError,
};

const STATEMENTS_PATH: &str = "/api/v2/statements";
const USER_AGENT: &str = concat!("metadata-sync/", env!("CARGO_PKG_VERSION"));

/// Opens Snowflake SQL API sessions.
#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    config: Arc<SnowflakeConfig>,
    client: reqwest::Client,
}

impl SnowflakeConnector {
    /// Build a connector; fails only if the HTTP client cannot be built.
    pub fn new(config: SnowflakeConfig) -> Result<Self, WarehouseError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WarehouseError::connection_with("failed to build HTTP client", e))?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

#[async_trait::async_trait]
impl Connector for SnowflakeConnector {
    type Connection = SnowflakeWarehouse;

    async fn open(&self) -> Result<Self::Connection, WarehouseError> {
        tracing::debug!(
            "Connecting to Snowflake account {} as {} (database: {}, schema: {})",
            self.config.account,
            self.config.user,
            self.config.database,
            self.config.schema
        );

        let mut warehouse = SnowflakeWarehouse {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
            closed: false,
        };

        // The API is stateless; a trivial statement proves the token and context
        let probe = RenderedStatement {
            sql: "SELECT 1".to_string(),
            params: Vec::new(),
        };
        if let Err(e) = warehouse.submit("SELECT 1", &probe).await {
            warehouse.close().await;
            return Err(match e {
                WarehouseError::Statement { message, .. } => WarehouseError::connection(format!(
                    "Snowflake rejected the session context: {message}"
                )),
                connection => connection,
            });
        }

        tracing::info!("Connected to Snowflake account {}", self.config.account);
        Ok(warehouse)
    }
}

/// Snowflake session; each statement is an independent API request.
#[derive(Debug)]
pub struct SnowflakeWarehouse {
    config: Arc<SnowflakeConfig>,
    client: reqwest::Client,
    closed: bool,
}

impl SnowflakeWarehouse {
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.config.token_type.header_value(),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn submit(
        &self,
        summary: &str,
        rendered: &RenderedStatement,
    ) -> Result<StatementResponse, WarehouseError> {
        let body = StatementRequest {
            statement: rendered.sql.clone(),
            timeout: 0,
            database: self.config.database.clone(),
            schema: self.config.schema.clone(),
            warehouse: self.config.warehouse.clone(),
            role: self.config.role.clone(),
            bindings: if rendered.params.is_empty() {
                BTreeMap::new()
            } else {
                bindings(&rendered.params)
            },
        };

        let url = format!("{}{}", self.config.base_url(), STATEMENTS_PATH);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(summary, e))?;

        let mut reply = read_reply(summary, response).await?;

        // 202: still running, poll by handle
        while reply.status == StatusCode::ACCEPTED {
            let handle = reply.body.statement_handle.clone().ok_or_else(|| {
                WarehouseError::statement(summary, "statement accepted without a handle")
            })?;
            tracing::trace!("Statement {} still running, polling", handle);
            tokio::time::sleep(self.config.poll_interval).await;

            let status_url = format!("{}{}/{}", self.config.base_url(), STATEMENTS_PATH, handle);
            let response = self
                .request(reqwest::Method::GET, &status_url)
                .send()
                .await
                .map_err(|e| transport_error(summary, e))?;
            reply = read_reply(summary, response).await?;
        }

        Ok(reply.body)
    }
}

#[async_trait::async_trait]
impl Warehouse for SnowflakeWarehouse {
    async fn execute(&mut self, statement: &Statement) -> Result<RowEffect, WarehouseError> {
        if self.closed {
            return Err(WarehouseError::connection("session is closed"));
        }

        let rendered = Dialect::Snowflake.render(statement);
        tracing::trace!("Executing: {}", rendered.sql);

        let response = self.submit(&statement.to_string(), &rendered).await?;
        Ok(RowEffect::rows(response.rows_affected()))
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::debug!("Snowflake session closed");
        }
    }
}

struct Reply {
    status: StatusCode,
    body: StatementResponse,
}

async fn read_reply(summary: &str, response: reqwest::Response) -> Result<Reply, WarehouseError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(summary, e))?;
    // Error bodies are not always JSON (gateway pages); keep the raw text then
    let body: StatementResponse = serde_json::from_str(&text).unwrap_or_else(|_| StatementResponse {
        message: Some(text.trim().chars().take(200).collect()),
        ..StatementResponse::default()
    });

    match classify_status(status) {
        StatusClass::Done | StatusClass::Running => Ok(Reply { status, body }),
        StatusClass::Unauthorized => Err(WarehouseError::connection(format!(
            "Snowflake authentication failed ({status}): {}",
            body.describe()
        ))),
        StatusClass::Rejected => Err(WarehouseError::statement(
            summary,
            format!("{status}: {}", body.describe()),
        )),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Done,
    Running,
    Unauthorized,
    Rejected,
}

fn classify_status(status: StatusCode) -> StatusClass {
    match status {
        StatusCode::ACCEPTED => StatusClass::Running,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StatusClass::Unauthorized,
        s if s.is_success() => StatusClass::Done,
        _ => StatusClass::Rejected,
    }
}

fn transport_error(summary: &str, e: reqwest::Error) -> WarehouseError {
    if e.is_timeout() {
        WarehouseError::statement_with(summary, "request timed out", e)
    } else if e.is_connect() {
        WarehouseError::connection_with("failed to reach Snowflake", e)
    } else {
        WarehouseError::statement_with(summary, e.to_string(), e)
    }
}
