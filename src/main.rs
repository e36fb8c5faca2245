//! Command-line interface for metadata-sync
//!
//! # Usage Examples
//!
//! ## Sync
//! ```bash
//! # Snowflake, credentials from the environment
//! export SNOWFLAKE_ACCOUNT=myorg-myaccount SNOWFLAKE_USER=sync SNOWFLAKE_TOKEN=...
//! export SNOWFLAKE_DATABASE=METADATA SNOWFLAKE_SCHEMA=PUBLIC
//! metadata-sync sync snowflake --snapshots ./snapshots
//!
//! # PostgreSQL, one source read from an explicit file
//! metadata-sync sync postgresql \
//!   --postgres-connection-string "host=localhost user=postgres dbname=metadata" \
//!   --snapshots ./snapshots \
//!   --source origenes=./exports/origenes_2024.json
//!
//! # Validate snapshots and the registry without touching a warehouse
//! metadata-sync sync snowflake --snapshots ./snapshots --dry-run
//! ```
//!
//! ## Registry
//! ```bash
//! metadata-sync registry --registry tables.yaml --dialect snowflake
//! ```
//!
//! ## Exit Codes
//! - 0: every table synced with no failed record
//! - 1: invalid configuration or a connection-level failure
//! - 2: the run completed but some tables or records failed

use anyhow::Context;
use clap::{Parser, Subcommand};
use metadata_sync::config::load_registry;
use metadata_sync::{
    RunReport, SchemaReconciler, SyncOpts, SyncOrchestrator, WarehouseConfig, WarehouseKind,
    WarehouseOpts,
};
use metadata_sync_json_source::FileSnapshotLoader;
use postgresql_sink::PostgresConnector;
use snowflake_sink::SnowflakeConnector;
use warehouse_sink::{Connector, Dialect, MemoryConnector, TimeoutConnector};

#[derive(Parser)]
#[command(name = "metadata-sync")]
#[command(about = "Reconcile JSON metadata snapshots with warehouse tables")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the registry tables if needed and merge every snapshot into them
    Sync {
        /// Target warehouse
        #[arg(value_enum)]
        warehouse: WarehouseKind,

        /// Warehouse connection options
        #[command(flatten)]
        warehouse_opts: WarehouseOpts,

        /// Snapshot, registry, and run options
        #[command(flatten)]
        sync_opts: SyncOpts,
    },

    /// Validate the registry and print the DDL it renders
    Registry {
        /// Registry YAML file (default: built-in metadata tables)
        #[arg(long, value_name = "PATH")]
        registry: Option<std::path::PathBuf>,

        /// SQL dialect to render
        #[arg(long, default_value = "snowflake")]
        dialect: Dialect,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match run().await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run() -> anyhow::Result<i32> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            warehouse,
            warehouse_opts,
            sync_opts,
        } => run_sync(warehouse, warehouse_opts, sync_opts).await,
        Commands::Registry { registry, dialect } => {
            let registry = load_registry(registry.as_deref())
                .context("Failed to load table registry")?;
            for spec in &registry {
                println!(
                    "-- {} (source: {}, key: {})",
                    spec.table,
                    spec.source,
                    spec.key.join(", ")
                );
                println!(
                    "{};\n",
                    dialect.create_table_sql(spec, warehouse_sink::CreateMode::IfNotExists)
                );
            }
            Ok(0)
        }
    }
}

async fn run_sync(
    warehouse: WarehouseKind,
    warehouse_opts: WarehouseOpts,
    sync_opts: SyncOpts,
) -> anyhow::Result<i32> {
    let registry = load_registry(sync_opts.registry.as_deref())
        .context("Failed to load table registry")?;
    let loader = sync_opts.loader()?;
    let timeout = sync_opts.statement_timeout()?;
    let orchestrator = SyncOrchestrator::new(
        registry,
        loader,
        SchemaReconciler::new(sync_opts.schema_policy),
    );

    let report = if sync_opts.dry_run {
        tracing::info!("Dry run: using an in-memory {} stand-in", warehouse);
        execute(&orchestrator, TimeoutConnector::new(MemoryConnector::new(), timeout)).await
    } else {
        match warehouse_opts
            .validate(warehouse)
            .context("Invalid warehouse configuration")?
        {
            WarehouseConfig::Snowflake(config) => {
                let connector = SnowflakeConnector::new(config)?;
                execute(&orchestrator, TimeoutConnector::new(connector, timeout)).await
            }
            WarehouseConfig::PostgreSQL(config) => {
                let connector = PostgresConnector::new(config);
                execute(&orchestrator, TimeoutConnector::new(connector, timeout)).await
            }
        }
    };

    if sync_opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    Ok(exit_code(&report))
}

async fn execute<C: Connector>(
    orchestrator: &SyncOrchestrator<FileSnapshotLoader>,
    connector: C,
) -> RunReport {
    orchestrator.run(&connector).await
}

fn exit_code(report: &RunReport) -> i32 {
    if !report.is_done() {
        1
    } else if !report.is_clean() {
        2
    } else {
        0
    }
}
