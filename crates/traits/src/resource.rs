//! ResourceProvider trait for abstracting the loadable resource space.
//!
//! A provider is one root of the resource space (a directory, an archive,
//! an in-memory bundle). The locator consults its roots in order, the way a
//! class loader walks its classpath entries.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("could not locate resource [{0}]")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("malformed resource location [{0}]")]
    Malformed(String),

    #[error("unsupported resource location [{0}]; only local schemes can be opened")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ResourceError {
    /// True when the error only says the resource does not exist.
    ///
    /// Resolvers treat this case as a decline rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_))
    }

    /// True when the location can never be served locally (not found, or a
    /// scheme such as `http:` that would need the network).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResourceError::NotFound(_) | ResourceError::Unsupported(_))
    }
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// One root of the loadable resource space.
///
/// Entry names are `/`-separated and relative to the root, e.g.
/// `docbook/rng/docbook.rng` or `html/chunk.xsl`.
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load an entry by name.
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    /// Check whether an entry exists.
    fn exists(&self, path: &str) -> bool;

    /// External form of the URL naming `path` inside this root.
    ///
    /// The URL is the identity used for diagnostics, as the system
    /// identifier of resolved sources and as the template cache key.
    fn url_for(&self, path: &str) -> String;

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// An in-memory resource root.
///
/// Useful for bundling generated resources and for tests.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<String, SharedResourceData>>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous entry of the same name.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<(), ResourceError> {
        let path = normalize_entry_name(&path.into()).to_string();
        let mut resources = self.resources.write().map_err(|_| ResourceError::LoadFailed {
            path: path.clone(),
            message: "resource store lock poisoned".to_string(),
        })?;
        resources.insert(path, Arc::new(data.into()));
        Ok(())
    }

    /// Remove an entry from the store.
    ///
    /// Returns `None` if the lock is poisoned or the entry doesn't exist.
    pub fn remove(&self, path: &str) -> Option<SharedResourceData> {
        self.resources.write().ok()?.remove(normalize_entry_name(path))
    }

    /// Number of entries. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let resources = self.resources.read().map_err(|_| ResourceError::LoadFailed {
            path: path.to_string(),
            message: "resource store lock poisoned".to_string(),
        })?;
        resources
            .get(normalize_entry_name(path))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(normalize_entry_name(path)))
            .unwrap_or(false)
    }

    fn url_for(&self, path: &str) -> String {
        format!("memory:/{}", normalize_entry_name(path))
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}

/// Strips the leading slashes a classpath-style name may carry.
pub fn normalize_entry_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_provider_add_and_load() {
        let provider = InMemoryResourceProvider::new();
        provider.add("html/chunk.xsl", "<xsl:stylesheet/>").unwrap();

        let data = provider.load("html/chunk.xsl").unwrap();
        assert_eq!(&*data, b"<xsl:stylesheet/>");
    }

    #[test]
    fn test_in_memory_provider_leading_slash_is_ignored() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/docbook/rng/docbook.rng", "rng").unwrap();

        assert!(provider.exists("docbook/rng/docbook.rng"));
        assert!(provider.exists("//docbook/rng/docbook.rng"));
        assert_eq!(provider.url_for("/docbook/rng/docbook.rng"), "memory:/docbook/rng/docbook.rng");
    }

    #[test]
    fn test_in_memory_provider_not_found() {
        let provider = InMemoryResourceProvider::new();
        let result = provider.load("nonexistent.xsl");
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_in_memory_provider_overwrite_and_remove() {
        let provider = InMemoryResourceProvider::new();
        provider.add("catalog.xml", "original").unwrap();
        provider.add("catalog.xml", "updated").unwrap();
        assert_eq!(provider.len(), 1);
        assert_eq!(&*provider.load("catalog.xml").unwrap(), b"updated");

        assert!(provider.remove("catalog.xml").is_some());
        assert!(provider.is_empty());
        assert!(provider.remove("catalog.xml").is_none());
    }

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound("html/chunk.xsl".to_string());
        assert_eq!(err.to_string(), "could not locate resource [html/chunk.xsl]");

        let err = ResourceError::LoadFailed {
            path: "file.xsl".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("file.xsl"));
        assert!(err.to_string().contains("permission denied"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_resource_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let resource_err: ResourceError = io_err.into();
        assert!(matches!(resource_err, ResourceError::Io(_)));
        assert!(resource_err.to_string().contains("denied"));
    }
}
