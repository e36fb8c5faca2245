//! Snapshot loading errors

/// A snapshot could not be obtained or is not a sequence of flat records.
#[derive(Debug, thiserror::Error)]
pub enum SourceLoadError {
    /// No resource exists for the source
    #[error("snapshot not found: {resource}")]
    NotFound { resource: String },

    /// Reading the resource failed
    #[error("failed to read snapshot {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// Fetching the resource over HTTP failed
    #[error("failed to fetch snapshot {resource}: {message}")]
    Http { resource: String, message: String },

    /// The resource is not valid JSON
    #[error("snapshot {resource} is not valid JSON: {source}")]
    Malformed {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    /// The top-level JSON value is not an array
    #[error("snapshot {resource} must be a JSON array of objects, found {found}")]
    NotAnArray { resource: String, found: &'static str },

    /// An array element is not an object
    #[error("snapshot {resource} element {index} must be an object, found {found}")]
    NotAnObject {
        resource: String,
        index: usize,
        found: &'static str,
    },

    /// An object field holds an array or object
    #[error("snapshot {resource} element {index} field '{column}' must be a scalar, found {found}")]
    NestedValue {
        resource: String,
        index: usize,
        column: String,
        found: &'static str,
    },
}

impl SourceLoadError {
    /// The resource the error refers to.
    pub fn resource(&self) -> &str {
        match self {
            Self::NotFound { resource }
            | Self::Io { resource, .. }
            | Self::Http { resource, .. }
            | Self::Malformed { resource, .. }
            | Self::NotAnArray { resource, .. }
            | Self::NotAnObject { resource, .. }
            | Self::NestedValue { resource, .. } => resource,
        }
    }
}
