//! Source identifier to resource mapping

use std::path::PathBuf;

/// File extension appended to source identifiers that carry none.
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Base location holding one snapshot resource per source identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotLocation {
    /// Local directory
    Local(PathBuf),
    /// HTTP/HTTPS base URL
    Http(String),
}

impl SnapshotLocation {
    /// Parse a string into a location, auto-detecting the kind.
    ///
    /// - `http://` or `https://` -> Http
    /// - Everything else -> Local directory
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            SnapshotLocation::Http(uri.to_string())
        } else {
            SnapshotLocation::Local(PathBuf::from(uri))
        }
    }

    /// Resolve the resource for a source identifier.
    ///
    /// `origenes` resolves to `<base>/origenes.json`; an identifier that
    /// already has an extension (`origenes.json`, `dump.txt`) is used as is.
    pub fn resolve(&self, source_id: &str) -> ResolvedSnapshot {
        let file_name = file_name_for(source_id);
        match self {
            SnapshotLocation::Local(dir) => ResolvedSnapshot::Local(dir.join(file_name)),
            SnapshotLocation::Http(base) => {
                ResolvedSnapshot::Http(format!("{}/{}", base.trim_end_matches('/'), file_name))
            }
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            SnapshotLocation::Local(path) => path.display().to_string(),
            SnapshotLocation::Http(url) => url.clone(),
        }
    }
}

/// A single snapshot resource ready for reading
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSnapshot {
    /// Local file
    Local(PathBuf),
    /// HTTP/HTTPS URL
    Http(String),
}

impl ResolvedSnapshot {
    /// Parse an explicit resource (file path or URL).
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            ResolvedSnapshot::Http(uri.to_string())
        } else {
            ResolvedSnapshot::Local(PathBuf::from(uri))
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            ResolvedSnapshot::Local(path) => path.display().to_string(),
            ResolvedSnapshot::Http(url) => url.clone(),
        }
    }
}

fn file_name_for(source_id: &str) -> String {
    let has_extension = source_id
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty() && !ext.contains('/'));
    if has_extension {
        source_id.to_string()
    } else {
        format!("{source_id}.{SNAPSHOT_EXTENSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_directory() {
        let location = SnapshotLocation::parse("/data/snapshots/");
        assert!(matches!(location, SnapshotLocation::Local(_)));
    }

    #[test]
    fn test_parse_http_url() {
        let location = SnapshotLocation::parse("https://example.com/metadata");
        assert!(matches!(location, SnapshotLocation::Http(_)));
    }

    #[test]
    fn test_resolve_local_appends_extension() {
        let location = SnapshotLocation::parse("/data/snapshots");
        assert_eq!(
            location.resolve("origenes"),
            ResolvedSnapshot::Local(PathBuf::from("/data/snapshots/origenes.json"))
        );
        assert_eq!(
            location.resolve("origenes.json"),
            ResolvedSnapshot::Local(PathBuf::from("/data/snapshots/origenes.json"))
        );
    }

    #[test]
    fn test_resolve_http_joins_once() {
        let location = SnapshotLocation::parse("https://example.com/metadata/");
        assert_eq!(
            location.resolve("casos_uso"),
            ResolvedSnapshot::Http("https://example.com/metadata/casos_uso.json".to_string())
        );
    }

    #[test]
    fn test_parse_resolved() {
        assert_eq!(
            ResolvedSnapshot::parse("./x.json"),
            ResolvedSnapshot::Local(PathBuf::from("./x.json"))
        );
        assert!(matches!(
            ResolvedSnapshot::parse("http://host/x.json"),
            ResolvedSnapshot::Http(_)
        ));
    }
}
