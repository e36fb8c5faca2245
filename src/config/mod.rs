//! Command-line and environment configuration.
//!
//! Options are collected by clap (flags or environment variables) and then
//! validated in one step, before any connection is attempted.

mod duration;

pub use duration::parse_duration;

use clap::{Args, ValueEnum};
use metadata_sync_json_source::{FileSnapshotLoader, ResolvedSnapshot, SnapshotLocation};
use postgresql_sink::PostgresConfig;
use snowflake_sink::{SnowflakeConfig, TokenType};
use std::path::PathBuf;
use std::time::Duration;
use sync_core::{is_valid_identifier, Registry};

use crate::schema::SchemaPolicy;

/// Configuration problems found before connecting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required settings are absent
    #[error("missing required {warehouse} settings: {}", .settings.join(", "))]
    Missing {
        warehouse: WarehouseKind,
        settings: Vec<&'static str>,
    },

    /// A setting is present but unusable
    #[error("invalid value for {setting}: {message}")]
    InvalidValue {
        setting: &'static str,
        message: String,
    },

    /// `--source` not in `<source_id>=<path|url>` form
    #[error("invalid --source override '{0}', expected <source_id>=<path|url>")]
    InvalidSourceOverride(String),

    /// Registry file could not be loaded or is inconsistent
    #[error(transparent)]
    Registry(#[from] sync_core::RegistryError),
}

/// Supported warehouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WarehouseKind {
    /// Snowflake via the SQL REST API
    #[value(name = "snowflake")]
    Snowflake,
    /// PostgreSQL 15+
    #[value(name = "postgresql", alias = "postgres")]
    PostgreSQL,
}

impl std::fmt::Display for WarehouseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarehouseKind::Snowflake => write!(f, "Snowflake"),
            WarehouseKind::PostgreSQL => write!(f, "PostgreSQL"),
        }
    }
}

/// Warehouse connection options
#[derive(Args, Clone, Debug, Default)]
pub struct WarehouseOpts {
    /// Snowflake account identifier (e.g. myorg-myaccount)
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub snowflake_account: Option<String>,

    /// Snowflake login name
    #[arg(long, env = "SNOWFLAKE_USER")]
    pub snowflake_user: Option<String>,

    /// Snowflake bearer token
    #[arg(long, env = "SNOWFLAKE_TOKEN", hide_env_values = true)]
    pub snowflake_token: Option<String>,

    /// Kind of Snowflake token: pat, oauth, or jwt (default: pat)
    #[arg(long, env = "SNOWFLAKE_TOKEN_TYPE")]
    pub snowflake_token_type: Option<String>,

    /// Snowflake role
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub snowflake_role: Option<String>,

    /// Snowflake virtual warehouse
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub snowflake_warehouse: Option<String>,

    /// Snowflake database
    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub snowflake_database: Option<String>,

    /// Snowflake schema
    #[arg(long, env = "SNOWFLAKE_SCHEMA")]
    pub snowflake_schema: Option<String>,

    /// PostgreSQL connection string (key/value or URL form)
    #[arg(long, env = "POSTGRES_CONNECTION_STRING", hide_env_values = true)]
    pub postgres_connection_string: Option<String>,

    /// PostgreSQL schema to use as search_path
    #[arg(long, env = "POSTGRES_SCHEMA")]
    pub postgres_schema: Option<String>,
}

/// Validated warehouse configuration.
#[derive(Debug, Clone)]
pub enum WarehouseConfig {
    Snowflake(SnowflakeConfig),
    PostgreSQL(PostgresConfig),
}

impl WarehouseOpts {
    /// Check the settings needed for `kind` and build its configuration.
    ///
    /// All missing settings are reported together.
    pub fn validate(&self, kind: WarehouseKind) -> Result<WarehouseConfig, ConfigError> {
        match kind {
            WarehouseKind::Snowflake => self.validate_snowflake().map(WarehouseConfig::Snowflake),
            WarehouseKind::PostgreSQL => self.validate_postgres().map(WarehouseConfig::PostgreSQL),
        }
    }

    fn validate_snowflake(&self) -> Result<SnowflakeConfig, ConfigError> {
        let required = [
            ("SNOWFLAKE_ACCOUNT", &self.snowflake_account),
            ("SNOWFLAKE_USER", &self.snowflake_user),
            ("SNOWFLAKE_TOKEN", &self.snowflake_token),
            ("SNOWFLAKE_DATABASE", &self.snowflake_database),
            ("SNOWFLAKE_SCHEMA", &self.snowflake_schema),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing {
                warehouse: WarehouseKind::Snowflake,
                settings: missing,
            });
        }

        let token_type = match &self.snowflake_token_type {
            Some(s) => s
                .parse::<TokenType>()
                .map_err(|message| ConfigError::InvalidValue {
                    setting: "SNOWFLAKE_TOKEN_TYPE",
                    message,
                })?,
            None => TokenType::default(),
        };

        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut config = SnowflakeConfig::new(
            value(&self.snowflake_account),
            value(&self.snowflake_user),
            value(&self.snowflake_token),
            value(&self.snowflake_database),
            value(&self.snowflake_schema),
        );
        config.token_type = token_type;
        config.role = self.snowflake_role.clone();
        config.warehouse = self.snowflake_warehouse.clone();
        Ok(config)
    }

    fn validate_postgres(&self) -> Result<PostgresConfig, ConfigError> {
        let Some(connection_string) = self
            .postgres_connection_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        else {
            return Err(ConfigError::Missing {
                warehouse: WarehouseKind::PostgreSQL,
                settings: vec!["POSTGRES_CONNECTION_STRING"],
            });
        };

        if let Some(schema) = &self.postgres_schema {
            if !is_valid_identifier(schema) {
                return Err(ConfigError::InvalidValue {
                    setting: "POSTGRES_SCHEMA",
                    message: format!("'{schema}' is not a valid identifier"),
                });
            }
        }

        PostgresConfig::new(connection_string, self.postgres_schema.clone()).map_err(|e| {
            ConfigError::InvalidValue {
                setting: "POSTGRES_CONNECTION_STRING",
                message: e.to_string(),
            }
        })
    }
}

/// Options shared by every sync run
#[derive(Args, Clone, Debug)]
pub struct SyncOpts {
    /// Directory or HTTP(S) base URL holding one `<source_id>.json` per table
    #[arg(long, default_value = ".", env = "METADATA_SNAPSHOTS")]
    pub snapshots: String,

    /// Explicit snapshot for one source (format: <source_id>=<path|url>), repeatable
    #[arg(long = "source", value_name = "SOURCE_ID=PATH")]
    pub sources: Vec<String>,

    /// Registry YAML file (default: built-in metadata tables)
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// What to do with tables that already exist
    #[arg(long, value_enum, default_value_t = SchemaPolicy::CreateIfAbsent)]
    pub schema_policy: SchemaPolicy,

    /// Per-statement timeout (e.g. "30s", "2m"); none by default
    #[arg(long)]
    pub statement_timeout: Option<String>,

    /// Run against an in-memory warehouse instead of connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncOpts {
    /// Snapshot loader for the configured location and overrides.
    pub fn loader(&self) -> Result<FileSnapshotLoader, ConfigError> {
        let mut loader = FileSnapshotLoader::new(SnapshotLocation::parse(&self.snapshots));
        for raw in &self.sources {
            let (source_id, resource) = parse_source_override(raw)?;
            loader = loader.with_override(source_id, resource);
        }
        Ok(loader)
    }

    /// Per-statement timeout, if one was given.
    pub fn statement_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.statement_timeout
            .as_deref()
            .map(|s| {
                parse_duration(s).map_err(|e| ConfigError::InvalidValue {
                    setting: "--statement-timeout",
                    message: format!("{e:#}"),
                })
            })
            .transpose()
    }
}

/// Load the registry from `path`, or the built-in metadata tables.
pub fn load_registry(path: Option<&std::path::Path>) -> Result<Registry, ConfigError> {
    match path {
        Some(path) => Ok(Registry::from_file(path)?),
        None => Ok(Registry::metadata_tables()),
    }
}

/// Split `<source_id>=<path|url>`.
pub fn parse_source_override(raw: &str) -> Result<(String, ResolvedSnapshot), ConfigError> {
    match raw.split_once('=') {
        Some((id, resource)) if !id.trim().is_empty() && !resource.trim().is_empty() => {
            Ok((id.trim().to_string(), ResolvedSnapshot::parse(resource.trim())))
        }
        _ => Err(ConfigError::InvalidSourceOverride(raw.to_string())),
    }
}
