//! Scheme-aware lookup over the ordered resource roots.

use crate::archive::ArchiveResourceProvider;
use crate::filesystem::FilesystemResourceProvider;
use crate::open::open_url;
use crate::uri::file_url_to_path;
use docweave_traits::{ResourceError, ResourceProvider, SharedResourceData, normalize_entry_name};
use log::{debug, trace};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const CLASSPATH_SCHEME: &str = "classpath:";
pub const FILE_SCHEME: &str = "file:";

#[derive(Clone)]
enum Origin {
    Root {
        provider: Arc<dyn ResourceProvider>,
        path: String,
    },
    External,
}

/// A located resource: its URL identity plus the means to open it.
#[derive(Clone)]
pub struct ResourceLocation {
    url: String,
    origin: Origin,
}

impl ResourceLocation {
    /// A location outside the resource roots, opened through [`open_url`].
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            origin: Origin::External,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn open(&self) -> Result<SharedResourceData, ResourceError> {
        match &self.origin {
            Origin::Root { provider, path } => provider.load(path),
            Origin::External => open_url(&self.url),
        }
    }
}

impl fmt::Debug for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::Root { provider, .. } => provider.name(),
            Origin::External => "external",
        };
        f.debug_struct("ResourceLocation")
            .field("url", &self.url)
            .field("origin", &origin)
            .finish()
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// The loadable resource space: roots consulted in insertion order.
#[derive(Debug, Default, Clone)]
pub struct ResourceLocator {
    roots: Vec<Arc<dyn ResourceProvider>>,
}

impl ResourceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: Arc<dyn ResourceProvider>) -> Self {
        self.add_root(root);
        self
    }

    pub fn add_root(&mut self, root: Arc<dyn ResourceProvider>) {
        debug!("adding resource root {}", root.name());
        self.roots.push(root);
    }

    /// Adds a directory or an archive file as a root.
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ResourceError> {
        let path = path.as_ref();
        if path.is_dir() {
            self.add_root(Arc::new(FilesystemResourceProvider::new(path)));
        } else {
            self.add_root(Arc::new(ArchiveResourceProvider::open(path)?));
        }
        Ok(())
    }

    pub fn roots(&self) -> &[Arc<dyn ResourceProvider>] {
        &self.roots
    }

    /// Looks `name` up in the roots only; `name` carries no scheme.
    pub fn locate_classpath_resource(&self, name: &str) -> Option<ResourceLocation> {
        let entry = normalize_entry_name(name);
        let found = self.roots.iter().find(|root| root.exists(entry)).map(|root| ResourceLocation {
            url: root.url_for(entry),
            origin: Origin::Root {
                provider: Arc::clone(root),
                path: entry.to_string(),
            },
        });
        trace!("classpath lookup [{}] -> {:?}", entry, found.as_ref().map(ResourceLocation::url));
        found
    }

    /// Locates a named resource.
    ///
    /// `classpath:` names are looked up in the roots, `file:` names are
    /// explicit locations, and unscoped names default to a classpath
    /// lookup.
    pub fn locate_resource(&self, name: &str) -> Result<Option<ResourceLocation>, ResourceError> {
        if let Some(entry) = name.strip_prefix(CLASSPATH_SCHEME) {
            return Ok(self.locate_classpath_resource(entry));
        }
        if name.starts_with(FILE_SCHEME) {
            let path = file_url_to_path(name)
                .ok_or_else(|| ResourceError::Malformed(format!("malformed explicit file url [{name}]")))?;
            return Ok(path.is_file().then(|| ResourceLocation::external(name)));
        }
        Ok(self.locate_classpath_resource(name))
    }

    /// As [`locate_resource`](Self::locate_resource), failing when absent.
    pub fn require_resource(&self, name: &str) -> Result<ResourceLocation, ResourceError> {
        self.locate_resource(name)?
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))
    }

    /// Every root's entry named `name`, in root order.
    pub fn find_all(&self, name: &str) -> Vec<ResourceLocation> {
        let entry = normalize_entry_name(name);
        self.roots
            .iter()
            .filter(|root| root.exists(entry))
            .map(|root| ResourceLocation {
                url: root.url_for(entry),
                origin: Origin::Root {
                    provider: Arc::clone(root),
                    path: entry.to_string(),
                },
            })
            .collect()
    }
}
