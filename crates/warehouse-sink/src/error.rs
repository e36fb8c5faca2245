//! Warehouse error classification.
//!
//! Connection-level errors end the sync run; statement errors are local to
//! the statement that raised them.

use thiserror::Error;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised by a warehouse connection.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// The session could not be established or was lost
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// One statement was rejected or did not complete
    #[error("statement failed: {message} [{statement}]")]
    Statement {
        statement: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl WarehouseError {
    /// Create a connection error without an underlying cause.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error wrapping a cause.
    pub fn connection_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a statement error without an underlying cause.
    pub fn statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Statement {
            statement: statement.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a statement error wrapping a cause.
    pub fn statement_with(
        statement: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Statement {
            statement: statement.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the error ends the run.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// The failing statement, for statement errors.
    pub fn failed_statement(&self) -> Option<&str> {
        match self {
            Self::Statement { statement, .. } => Some(statement),
            Self::Connection { .. } => None,
        }
    }
}
