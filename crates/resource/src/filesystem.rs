//! Directory roots of the resource space.
//!
//! Entries are loaded relative to the root directory. Names that would
//! escape the root (absolute paths, `..` traversal) are treated as absent,
//! so a resolver can never be tricked into serving a file outside the
//! packaged resource set.

use crate::uri::file_url;
use docweave_traits::{ResourceError, ResourceProvider, SharedResourceData, normalize_entry_name};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A resource root backed by a local directory.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    base_path: PathBuf,
    /// Canonicalized base path for containment checks
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        // may fail if the directory doesn't exist yet
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    /// Maps an entry name to a path inside the root, or `None` when the
    /// name would escape it.
    fn resolve_path_safe(&self, name: &str) -> Option<PathBuf> {
        let relative = normalize_entry_name(name);
        if relative.is_empty() || Path::new(relative).is_absolute() {
            return None;
        }
        if Path::new(relative).components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }

        let full_path = self.base_path.join(relative);
        if let Ok(canonical) = full_path.canonicalize()
            && let Some(base) = &self.canonical_base
        {
            // symlinks may still point outside the root
            return canonical.starts_with(base).then_some(canonical);
        }
        Some(full_path)
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self
            .resolve_path_safe(path)
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))?;

        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::LoadFailed {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path_safe(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.canonical_base.as_deref().unwrap_or(&self.base_path);
        file_url(&base.join(normalize_entry_name(path)))
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_filesystem_provider_load_existing_entry() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("html")).unwrap();
        fs::write(dir.path().join("html/chunk.xsl"), b"<xsl:stylesheet/>").unwrap();

        let provider = FilesystemResourceProvider::new(dir.path());
        let data = provider.load("html/chunk.xsl").unwrap();
        assert_eq!(&*data, b"<xsl:stylesheet/>");
        assert!(provider.exists("/html/chunk.xsl"));
    }

    #[test]
    fn test_filesystem_provider_not_found() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        let result = provider.load("missing.xsl");
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
        assert!(!provider.exists("missing.xsl"));
    }

    #[test]
    fn test_filesystem_provider_directories_are_not_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("html")).unwrap();

        let provider = FilesystemResourceProvider::new(dir.path());
        assert!(!provider.exists("html"));
    }

    #[test]
    fn test_filesystem_provider_url_for() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        let url = provider.url_for("/fo/docbook.xsl");
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("/fo/docbook.xsl"));
    }

    #[test]
    fn test_filesystem_provider_blocks_path_traversal() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        assert!(provider.load("../../../etc/passwd").is_err());
        assert!(!provider.exists("../../../etc/passwd"));
        assert!(!provider.exists("foo/../../../bar"));
        assert!(!provider.exists(".."));
    }

    #[test]
    fn test_filesystem_provider_treats_leading_slash_as_relative() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("catalog.xml"), b"<catalog/>").unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        // classpath-style names carry a leading slash; they stay inside the root
        assert!(provider.exists("/catalog.xml"));
        assert!(!provider.exists("/etc/passwd"));
    }
}
