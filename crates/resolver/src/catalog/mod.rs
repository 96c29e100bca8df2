//! XML catalog resolution.
//!
//! A [`CatalogSet`] is either *implicit* (every `catalog.xml` found in the
//! resource roots) or *explicit* (catalog locations named by the build
//! configuration). Catalogs are read lazily on first lookup and never
//! reloaded. [`CatalogResolver`] serves the set as the lowest-precedence
//! member of both resolution chains.

mod parser;

pub use parser::{CatalogError, parse_catalog};

use crate::open_location;
use docweave_resource::{CLASSPATH_SCHEME, FILE_SCHEME, ResourceLocation, ResourceLocator, Uri, file_url};
use docweave_traits::{EntityResolver, Resolution, ResolveError, ResolvedSource, UriResolver};
use log::{debug, trace, warn};
use parser::normalize_public_id;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Conventional name of implicitly discovered catalogs.
pub const IMPLICIT_CATALOG_NAME: &str = "catalog.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Public { public_id: String, uri: String },
    System { system_id: String, uri: String },
    Uri { name: String, uri: String },
    RewriteSystem { prefix: String, rewrite: String },
    RewriteUri { prefix: String, rewrite: String },
    SystemSuffix { suffix: String, uri: String },
    UriSuffix { suffix: String, uri: String },
}

/// One parsed catalog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub url: String,
    pub entries: Vec<CatalogEntry>,
    pub next_catalogs: Vec<String>,
}

impl Catalog {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            entries: Vec::new(),
            next_catalogs: Vec::new(),
        }
    }

    /// `system`, then the longest `rewriteSystem`, then the longest
    /// `systemSuffix`.
    pub fn lookup_system(&self, system_id: &str) -> Option<String> {
        let exact = self.entries.iter().find_map(|entry| match entry {
            CatalogEntry::System { system_id: id, uri } if id == system_id => Some(uri.clone()),
            _ => None,
        });
        exact
            .or_else(|| {
                self.longest(|entry| match entry {
                    CatalogEntry::RewriteSystem { prefix, rewrite } => system_id
                        .strip_prefix(prefix.as_str())
                        .map(|rest| (prefix.len(), format!("{rewrite}{rest}"))),
                    _ => None,
                })
            })
            .or_else(|| {
                self.longest(|entry| match entry {
                    CatalogEntry::SystemSuffix { suffix, uri } if system_id.ends_with(suffix.as_str()) => {
                        Some((suffix.len(), uri.clone()))
                    }
                    _ => None,
                })
            })
    }

    pub fn lookup_public(&self, public_id: &str) -> Option<String> {
        let public_id = normalize_public_id(public_id);
        self.entries.iter().find_map(|entry| match entry {
            CatalogEntry::Public { public_id: id, uri } if *id == public_id => Some(uri.clone()),
            _ => None,
        })
    }

    /// `uri`, then the longest `rewriteURI`, then the longest `uriSuffix`.
    pub fn lookup_uri(&self, name: &str) -> Option<String> {
        let exact = self.entries.iter().find_map(|entry| match entry {
            CatalogEntry::Uri { name: n, uri } if n == name => Some(uri.clone()),
            _ => None,
        });
        exact
            .or_else(|| {
                self.longest(|entry| match entry {
                    CatalogEntry::RewriteUri { prefix, rewrite } => name
                        .strip_prefix(prefix.as_str())
                        .map(|rest| (prefix.len(), format!("{rewrite}{rest}"))),
                    _ => None,
                })
            })
            .or_else(|| {
                self.longest(|entry| match entry {
                    CatalogEntry::UriSuffix { suffix, uri } if name.ends_with(suffix.as_str()) => {
                        Some((suffix.len(), uri.clone()))
                    }
                    _ => None,
                })
            })
    }

    /// Among the matching entries, the mapping with the longest match;
    /// the first declared wins a tie.
    fn longest<F>(&self, matcher: F) -> Option<String>
    where
        F: Fn(&CatalogEntry) -> Option<(usize, String)>,
    {
        self.entries
            .iter()
            .filter_map(matcher)
            .fold(None, |best: Option<(usize, String)>, candidate| match best {
                Some(b) if b.0 >= candidate.0 => Some(b),
                _ => Some(candidate),
            })
            .map(|(_, uri)| uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CatalogSource {
    Implicit,
    Explicit(Vec<String>),
}

/// The catalogs consulted by a build.
#[derive(Debug)]
pub struct CatalogSet {
    locator: Arc<ResourceLocator>,
    source: CatalogSource,
    catalogs: OnceLock<Vec<Catalog>>,
}

impl CatalogSet {
    /// Every `catalog.xml` in the resource roots, in root order.
    pub fn implicit(locator: Arc<ResourceLocator>) -> Self {
        Self {
            locator,
            source: CatalogSource::Implicit,
            catalogs: OnceLock::new(),
        }
    }

    /// The named catalogs, in order, without duplicates.
    pub fn explicit<I, S>(locator: Arc<ResourceLocator>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| seen.insert(name.clone()))
            .collect();
        Self {
            locator,
            source: CatalogSource::Explicit(names),
            catalogs: OnceLock::new(),
        }
    }

    /// Explicit when any catalog is named, implicit otherwise.
    pub fn for_names(locator: Arc<ResourceLocator>, names: &[String]) -> Self {
        if names.is_empty() {
            Self::implicit(locator)
        } else {
            Self::explicit(locator, names.iter().cloned())
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self.source, CatalogSource::Explicit(_))
    }

    /// The loaded catalogs, including those reached through `nextCatalog`.
    pub fn catalogs(&self) -> &[Catalog] {
        self.catalogs.get_or_init(|| self.load())
    }

    /// Maps an entity's identifiers. Catalogs are consulted one at a time,
    /// in load order; within a catalog system rules come before public
    /// rules.
    pub fn lookup_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Option<String> {
        self.catalogs().iter().find_map(|catalog| {
            system_id
                .and_then(|system_id| catalog.lookup_system(system_id))
                .or_else(|| public_id.and_then(|public_id| catalog.lookup_public(public_id)))
        })
    }

    /// Maps a URI reference. Each catalog in turn tries its URI rules, then
    /// its system identifier rules.
    pub fn lookup_uri(&self, uri: &str) -> Option<String> {
        self.catalogs()
            .iter()
            .find_map(|catalog| catalog.lookup_uri(uri).or_else(|| catalog.lookup_system(uri)))
    }

    fn load(&self) -> Vec<Catalog> {
        let initial = match &self.source {
            CatalogSource::Implicit => self.locator.find_all(IMPLICIT_CATALOG_NAME),
            CatalogSource::Explicit(names) => names.iter().filter_map(|name| self.locate_named(name)).collect(),
        };
        debug!("loading {} catalog(s)", initial.len());

        let mut visited = HashSet::new();
        let mut catalogs = Vec::new();
        for location in initial {
            self.load_recursive(location, &mut visited, &mut catalogs);
        }
        catalogs
    }

    fn locate_named(&self, name: &str) -> Option<ResourceLocation> {
        let located = if name.starts_with(CLASSPATH_SCHEME) || name.starts_with(FILE_SCHEME) {
            self.locator.locate_resource(name).ok().flatten()
        } else if Path::new(name).is_file() {
            Some(ResourceLocation::external(file_url(Path::new(name))))
        } else {
            self.locator.locate_classpath_resource(name)
        };
        if located.is_none() {
            warn!("catalog [{name}] could not be located; skipping");
        }
        located
    }

    fn load_recursive(&self, location: ResourceLocation, visited: &mut HashSet<String>, out: &mut Vec<Catalog>) {
        if !visited.insert(location.url().to_string()) {
            trace!("catalog [{}] already loaded", location.url());
            return;
        }
        let catalog = match location.open() {
            Ok(data) => match parse_catalog(&data, location.url()) {
                Ok(catalog) => catalog,
                Err(e) => {
                    warn!("{e}; skipping");
                    return;
                }
            },
            Err(e) => {
                warn!("catalog [{}] could not be read: {e}; skipping", location.url());
                return;
            }
        };
        let next = catalog.next_catalogs.clone();
        out.push(catalog);
        for url in next {
            self.load_recursive(self.location_for(&url), visited, out);
        }
    }

    fn location_for(&self, url: &str) -> ResourceLocation {
        if url.starts_with(CLASSPATH_SCHEME)
            && let Some(location) = self.locator.locate_resource(url).ok().flatten()
        {
            return location;
        }
        ResourceLocation::external(url)
    }

    fn open(&self, url: &str) -> Result<Option<ResolvedSource>, ResolveError> {
        open_location(&self.location_for(url))
    }
}

/// Serves a [`CatalogSet`] through both resolution protocols.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    catalogs: Arc<CatalogSet>,
}

impl CatalogResolver {
    pub fn new(catalogs: Arc<CatalogSet>) -> Self {
        Self { catalogs }
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }
}

impl EntityResolver for CatalogResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        let Some(mapped) = self.catalogs.lookup_entity(public_id, system_id) else {
            return Ok(Resolution::Declined);
        };
        trace!("catalog mapped publicId=[{public_id:?}]; systemId=[{system_id:?}] to [{mapped}]");
        Ok(self
            .catalogs
            .open(&mapped)?
            .map(|source| source.with_public_id(public_id))
            .into())
    }
}

impl UriResolver for CatalogResolver {
    fn resolve_uri(&self, href: &str, base: &str) -> Result<Resolution, ResolveError> {
        let mapped = self.catalogs.lookup_uri(href).or_else(|| {
            let absolute = Uri::parse(base).ok()?.resolve_str(href).ok()?.to_string();
            (absolute != href).then(|| self.catalogs.lookup_uri(&absolute)).flatten()
        });
        let Some(mapped) = mapped else {
            return Ok(Resolution::Declined);
        };
        trace!("catalog mapped href=[{href}] to [{mapped}]");
        Ok(self.catalogs.open(&mapped)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_resource::FilesystemResourceProvider;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn root_with(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn locator(dirs: &[&TempDir]) -> Arc<ResourceLocator> {
        let mut locator = ResourceLocator::new();
        for dir in dirs {
            locator.add_root(Arc::new(FilesystemResourceProvider::new(dir.path())));
        }
        Arc::new(locator)
    }

    const MAIN: &str = r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
  <public publicId="-//Example//DTD Book//EN" uri="dtd/book.dtd"/>
  <system systemId="http://example.com/book.dtd" uri="dtd/book.dtd"/>
  <rewriteSystem systemIdStartString="http://example.com/" rewritePrefix="mirror/"/>
  <rewriteSystem systemIdStartString="http://example.com/deep/" rewritePrefix="deep/"/>
  <uri name="http://example.com/style.xsl" uri="xsl/style.xsl"/>
  <rewriteURI uriStartString="http://docbook.sourceforge.net/release/xsl/current/" rewritePrefix="xsl/"/>
  <nextCatalog catalog="next/catalog.xml"/>
</catalog>"#;

    const NEXT: &str = r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
  <uriSuffix uriSuffix="/titlepage.xsl" uri="../xsl/titlepage.xsl"/>
  <nextCatalog catalog="../catalog.xml"/>
</catalog>"#;

    fn fixture() -> TempDir {
        root_with(&[
            ("catalog.xml", MAIN),
            ("next/catalog.xml", NEXT),
            ("dtd/book.dtd", "book dtd"),
            ("mirror/other.dtd", "mirrored"),
            ("deep/nested.dtd", "deep"),
            ("xsl/style.xsl", "style"),
            ("xsl/html/chunk.xsl", "chunk"),
            ("xsl/titlepage.xsl", "titlepage"),
        ])
    }

    fn text(resolution: Resolution) -> Option<String> {
        resolution.into_source().map(|s| s.text())
    }

    #[test]
    fn test_implicit_catalogs_follow_next_catalog_without_cycles() {
        let dir = fixture();
        let set = CatalogSet::implicit(locator(&[&dir]));
        assert!(!set.is_explicit());
        assert_eq!(set.catalogs().len(), 2);
    }

    #[test]
    fn test_entity_lookup_order() {
        let dir = fixture();
        let resolver = CatalogResolver::new(Arc::new(CatalogSet::implicit(locator(&[&dir]))));

        let by_system = resolver.resolve_entity(None, Some("http://example.com/book.dtd")).unwrap();
        assert_eq!(text(by_system).as_deref(), Some("book dtd"));

        let by_public = resolver.resolve_entity(Some("-//Example//DTD  Book//EN"), Some("unknown.dtd")).unwrap();
        let source = by_public.into_source().unwrap();
        assert_eq!(source.text(), "book dtd");
        assert_eq!(source.public_id.as_deref(), Some("-//Example//DTD  Book//EN"));

        let rewritten = resolver.resolve_entity(None, Some("http://example.com/other.dtd")).unwrap();
        assert_eq!(text(rewritten).as_deref(), Some("mirrored"));

        let longest = resolver.resolve_entity(None, Some("http://example.com/deep/nested.dtd")).unwrap();
        assert_eq!(text(longest).as_deref(), Some("deep"));

        assert_eq!(resolver.resolve_entity(None, Some("http://other.org/x.dtd")).unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_uri_lookup() {
        let dir = fixture();
        let resolver = CatalogResolver::new(Arc::new(CatalogSet::implicit(locator(&[&dir]))));

        assert_eq!(text(resolver.resolve_uri("http://example.com/style.xsl", "").unwrap()).as_deref(), Some("style"));
        let rewritten = resolver
            .resolve_uri("http://docbook.sourceforge.net/release/xsl/current/html/chunk.xsl", "")
            .unwrap();
        assert_eq!(text(rewritten).as_deref(), Some("chunk"));
        let suffix = resolver.resolve_uri("http://anywhere.net/html/titlepage.xsl", "").unwrap();
        assert_eq!(text(suffix).as_deref(), Some("titlepage"));
        // falls back to system rules
        assert_eq!(text(resolver.resolve_uri("http://example.com/book.dtd", "").unwrap()).as_deref(), Some("book dtd"));
        // relative href made absolute against the base
        let relative = resolver.resolve_uri("style.xsl", "http://example.com/main.xsl").unwrap();
        assert_eq!(text(relative).as_deref(), Some("style"));
    }

    #[test]
    fn test_earlier_catalog_wins_across_rule_kinds() {
        let first = root_with(&[
            (
                "catalog.xml",
                r#"<catalog>
  <public publicId="-//Example//DTD Book//EN" uri="first.dtd"/>
  <system systemId="http://example.com/style.xsl" uri="first.xsl"/>
</catalog>"#,
            ),
            ("first.dtd", "first catalog public"),
            ("first.xsl", "first catalog system"),
        ]);
        let second = root_with(&[
            (
                "catalog.xml",
                r#"<catalog>
  <system systemId="http://example.com/book.dtd" uri="second.dtd"/>
  <uri name="http://example.com/style.xsl" uri="second.xsl"/>
</catalog>"#,
            ),
            ("second.dtd", "second catalog system"),
            ("second.xsl", "second catalog uri"),
        ]);
        let resolver = CatalogResolver::new(Arc::new(CatalogSet::implicit(locator(&[&first, &second]))));

        let entity = resolver
            .resolve_entity(Some("-//Example//DTD Book//EN"), Some("http://example.com/book.dtd"))
            .unwrap();
        assert_eq!(text(entity).as_deref(), Some("first catalog public"));

        let uri = resolver.resolve_uri("http://example.com/style.xsl", "").unwrap();
        assert_eq!(text(uri).as_deref(), Some("first catalog system"));

        // without the public id only the second catalog matches
        let system_only = resolver.resolve_entity(None, Some("http://example.com/book.dtd")).unwrap();
        assert_eq!(text(system_only).as_deref(), Some("second catalog system"));
    }

    #[test]
    fn test_mapped_but_missing_target_declines() {
        let dir = root_with(&[(
            "catalog.xml",
            r#"<catalog><system systemId="http://example.com/gone.dtd" uri="gone.dtd"/></catalog>"#,
        )]);
        let resolver = CatalogResolver::new(Arc::new(CatalogSet::implicit(locator(&[&dir]))));
        assert_eq!(resolver.resolve_entity(None, Some("http://example.com/gone.dtd")).unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_explicit_catalogs_are_deduplicated_and_used_instead_of_implicit() {
        let implicit = fixture();
        let explicit = root_with(&[
            ("custom.xml", r#"<catalog><uri name="urn:style" uri="style.xsl"/></catalog>"#),
            ("style.xsl", "explicit style"),
        ]);
        let custom = explicit.path().join("custom.xml").display().to_string();
        let set = CatalogSet::for_names(locator(&[&implicit]), &[custom.clone(), custom.clone()]);
        assert!(set.is_explicit());
        assert_eq!(set.catalogs().len(), 1);

        let resolver = CatalogResolver::new(Arc::new(set));
        assert_eq!(text(resolver.resolve_uri("urn:style", "").unwrap()).as_deref(), Some("explicit style"));
        assert_eq!(resolver.resolve_uri("http://example.com/style.xsl", "").unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_bad_catalogs_are_skipped() {
        let broken = root_with(&[("catalog.xml", "<catalog><unclosed></catalog>")]);
        let good = fixture();
        let set = CatalogSet::implicit(locator(&[&broken, &good]));
        assert_eq!(set.catalogs().len(), 2);

        let missing = CatalogSet::explicit(locator(&[]), ["/definitely/not/here/catalog.xml"]);
        assert!(missing.catalogs().is_empty());
    }
}
