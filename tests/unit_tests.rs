use metadata_sync::json_source::SnapshotLoader;
use metadata_sync::{SchemaPolicy, SyncOpts, WarehouseKind, WarehouseOpts};
use sync_core::ScalarValue;
use tempfile::TempDir;

fn sync_opts(snapshots: &str) -> SyncOpts {
    SyncOpts {
        snapshots: snapshots.to_string(),
        sources: vec![],
        registry: None,
        schema_policy: SchemaPolicy::CreateIfAbsent,
        statement_timeout: None,
        dry_run: false,
        json: false,
    }
}

#[test]
fn test_sync_opts_creation() {
    let mut opts = sync_opts("./snapshots");
    opts.sources = vec!["origenes=./exports/origenes.json".to_string()];
    opts.schema_policy = SchemaPolicy::Replace;
    opts.dry_run = true;

    assert_eq!(opts.snapshots, "./snapshots");
    assert_eq!(opts.sources.len(), 1);
    assert_eq!(opts.schema_policy.to_string(), "replace");
    assert!(opts.dry_run);
    assert!(opts.loader().is_ok());
}

#[test]
fn test_malformed_source_override_is_rejected() {
    let mut opts = sync_opts(".");
    opts.sources = vec!["origenes".to_string()];
    assert!(opts.loader().is_err());
}

#[test]
fn test_default_schema_policy() {
    assert_eq!(SchemaPolicy::default(), SchemaPolicy::CreateIfAbsent);
    assert_eq!(SchemaPolicy::default().to_string(), "create-if-absent");
}

#[test]
fn test_warehouse_opts_default_is_incomplete() {
    let opts = WarehouseOpts::default();
    assert!(opts.validate(WarehouseKind::Snowflake).is_err());
    assert!(opts.validate(WarehouseKind::PostgreSQL).is_err());
}

#[test]
fn test_loader_honors_source_override() {
    let dir = TempDir::new().unwrap();
    let exported = dir.path().join("origenes_2024.json");
    std::fs::write(
        &exported,
        r#"[{"id_origen": "o1", "nombre_origen": "X", "activo": "true"}]"#,
    )
    .unwrap();

    let mut opts = sync_opts(dir.path().join("missing").to_str().unwrap());
    opts.sources = vec![format!("origenes={}", exported.display())];
    let loader = opts.loader().unwrap();

    let snapshot = tokio_test::block_on(loader.load("origenes")).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.records[0].get("nombre_origen"),
        Some(&ScalarValue::text("X"))
    );

    // Sources without an override still resolve under the base directory
    assert!(tokio_test::block_on(loader.load("casos_uso")).is_err());
}
