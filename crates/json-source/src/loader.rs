//! Snapshot loading from local files and HTTP

use crate::decode::decode_snapshot;
use crate::error::SourceLoadError;
use crate::location::{ResolvedSnapshot, SnapshotLocation};
use std::collections::HashMap;
use std::path::Path;
use sync_core::Snapshot;

/// Loads the snapshot for a source identifier.
///
/// The orchestrator only sees this trait, so tests and alternative sources
/// can stand in for the file-based loader.
#[async_trait::async_trait]
pub trait SnapshotLoader: Send + Sync {
    /// Load and decode the snapshot identified by `source_id`.
    async fn load(&self, source_id: &str) -> Result<Snapshot, SourceLoadError>;
}

/// Loads snapshots from a base location, with optional per-source overrides.
#[derive(Debug, Clone)]
pub struct FileSnapshotLoader {
    location: SnapshotLocation,
    overrides: HashMap<String, ResolvedSnapshot>,
    client: reqwest::Client,
}

impl FileSnapshotLoader {
    /// Create a loader resolving every source under `location`.
    pub fn new(location: SnapshotLocation) -> Self {
        Self {
            location,
            overrides: HashMap::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Map one source identifier to an explicit resource.
    pub fn with_override(mut self, source_id: impl Into<String>, resource: ResolvedSnapshot) -> Self {
        self.overrides.insert(source_id.into(), resource);
        self
    }

    /// Resource the given source identifier resolves to.
    pub fn resolve(&self, source_id: &str) -> ResolvedSnapshot {
        self.overrides
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| self.location.resolve(source_id))
    }

    async fn read(&self, resolved: &ResolvedSnapshot) -> Result<Vec<u8>, SourceLoadError> {
        match resolved {
            ResolvedSnapshot::Local(path) => read_local(path).await,
            ResolvedSnapshot::Http(url) => fetch_http(&self.client, url).await,
        }
    }
}

#[async_trait::async_trait]
impl SnapshotLoader for FileSnapshotLoader {
    async fn load(&self, source_id: &str) -> Result<Snapshot, SourceLoadError> {
        let resolved = self.resolve(source_id);
        let resource = resolved.display_name();
        tracing::debug!("Loading snapshot '{}' from {}", source_id, resource);

        let bytes = self.read(&resolved).await?;
        decode_snapshot(source_id, &resource, &bytes)
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, SourceLoadError> {
    tokio::fs::read(path).await.map_err(|e| {
        let resource = path.display().to_string();
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceLoadError::NotFound { resource }
        } else {
            SourceLoadError::Io {
                resource,
                source: e,
            }
        }
    })
}

async fn fetch_http(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceLoadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceLoadError::Http {
            resource: url.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceLoadError::NotFound {
            resource: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(SourceLoadError::Http {
            resource: url.to_string(),
            message: format!("HTTP request failed with status {status}"),
        });
    }

    let bytes = response.bytes().await.map_err(|e| SourceLoadError::Http {
        resource: url.to_string(),
        message: format!("failed to read response body: {e}"),
    })?;

    tracing::debug!("Fetched {} bytes from: {}", bytes.len(), url);

    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use sync_core::ScalarValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("origenes.json"),
            r#"[{"id_origen":"o1","nombre_origen":"X","activo":"true","id_caso_uso":"c1"}]"#,
        )
        .unwrap();

        let loader = FileSnapshotLoader::new(SnapshotLocation::Local(temp_dir.path().to_path_buf()));
        let snapshot = loader.load("origenes").await.unwrap();

        assert_eq!(snapshot.source, "origenes");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.records[0].get("nombre_origen"),
            Some(&ScalarValue::text("X"))
        );
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let custom = temp_dir.path().join("custom.txt");
        std::fs::write(&custom, r#"[{"id": "a"}]"#).unwrap();

        let loader = FileSnapshotLoader::new(SnapshotLocation::Local(PathBuf::from("/nonexistent")))
            .with_override("casos_uso", ResolvedSnapshot::Local(custom.clone()));

        assert_eq!(loader.resolve("casos_uso"), ResolvedSnapshot::Local(custom));
        let snapshot = loader.load("casos_uso").await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = FileSnapshotLoader::new(SnapshotLocation::Local(temp_dir.path().to_path_buf()));

        let err = loader.load("orquestadores").await.unwrap_err();
        assert!(matches!(err, SourceLoadError::NotFound { .. }));
        assert!(err.resource().ends_with("orquestadores.json"));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.json"), "not json").unwrap();
        let loader = FileSnapshotLoader::new(SnapshotLocation::Local(temp_dir.path().to_path_buf()));

        let err = loader.load("bad").await.unwrap_err();
        assert!(matches!(err, SourceLoadError::Malformed { .. }));
    }
}
