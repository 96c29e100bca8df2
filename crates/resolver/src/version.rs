//! Local resolution of version-templated stylesheet URIs.
//!
//! References of the form `{BASE_HREF}{version}/{path}`, or relative
//! references made from a stylesheet that was itself loaded from such a
//! URI, are answered from the packaged stylesheet distribution. Which
//! versions may be answered locally is decided by the configured
//! [`XsltResolutionStrategy`].

use crate::open_location;
use crate::schema::split_versioned;
use docweave_resource::{ResourceLocator, Uri, remove_dot_segments};
use docweave_traits::{Resolution, ResolveError, UriResolver};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Base of the versioned DocBook XSL distribution URIs.
pub const BASE_HREF: &str = "http://docbook.sourceforge.net/release/xsl/";

/// Version matched by the named strategy when none is configured.
pub const DEFAULT_VERSION: &str = "current";

/// Which requested stylesheet versions may resolve locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XsltResolutionStrategy {
    /// Any version resolves locally.
    Inclusive,
    /// Only the configured version resolves locally.
    #[default]
    Named,
}

impl fmt::Display for XsltResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsltResolutionStrategy::Inclusive => f.write_str("inclusive"),
            XsltResolutionStrategy::Named => f.write_str("named"),
        }
    }
}

impl FromStr for XsltResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inclusive" => Ok(XsltResolutionStrategy::Inclusive),
            "named" => Ok(XsltResolutionStrategy::Named),
            _ => Err(format!("unknown xslt resolution strategy [{s}]; expected inclusive or named")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionMatcher {
    Any,
    Exactly(String),
}

impl VersionMatcher {
    fn matches(&self, version: &str) -> bool {
        match self {
            VersionMatcher::Any => true,
            VersionMatcher::Exactly(expected) => expected == version,
        }
    }
}

/// Maps versioned DocBook XSL URIs to packaged stylesheet resources.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    locator: Arc<ResourceLocator>,
    matcher: VersionMatcher,
}

impl VersionResolver {
    /// `version` is only consulted by the named strategy; `None` means
    /// `"current"`.
    pub fn new(locator: Arc<ResourceLocator>, strategy: XsltResolutionStrategy, version: Option<&str>) -> Self {
        let matcher = match strategy {
            XsltResolutionStrategy::Inclusive => VersionMatcher::Any,
            XsltResolutionStrategy::Named => VersionMatcher::Exactly(version.unwrap_or(DEFAULT_VERSION).to_string()),
        };
        debug!("version resolver using {matcher:?}");
        Self { locator, matcher }
    }

    fn resolve_locally(&self, name: &str) -> Result<Resolution, ResolveError> {
        trace!("resolving [{name}] locally");
        match self.locator.require_resource(name) {
            Ok(location) => Ok(open_location(&location)?.into()),
            Err(e) if e.is_not_found() => {
                debug!("stylesheet [{name}] is not packaged; declining");
                Ok(Resolution::Declined)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl UriResolver for VersionResolver {
    fn resolve_uri(&self, href: &str, base: &str) -> Result<Resolution, ResolveError> {
        if let Some((version, path)) = split_versioned(href, BASE_HREF)
            && self.matcher.matches(version)
        {
            return self.resolve_locally(path);
        }

        let relative = Uri::parse(href).is_ok_and(|uri| !uri.is_absolute() && !href.starts_with('/'));
        if relative
            && let Some((version, remaining_base)) = split_versioned(base, BASE_HREF)
            && self.matcher.matches(version)
        {
            let directory = remaining_base.rfind('/').map_or("", |i| &remaining_base[..=i]);
            let name = remove_dot_segments(&format!("{directory}{href}"));
            return self.resolve_locally(&name);
        }

        Ok(Resolution::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_traits::{InMemoryResourceProvider, ResourceProvider};

    fn locator() -> Arc<ResourceLocator> {
        let provider = InMemoryResourceProvider::new();
        provider.add("html/chunk.xsl", "chunk").unwrap();
        provider.add("html/chunker.xsl", "chunker").unwrap();
        provider.add("common/common.xsl", "common").unwrap();
        let root: Arc<dyn ResourceProvider> = Arc::new(provider);
        Arc::new(ResourceLocator::new().with_root(root))
    }

    fn text(resolution: Resolution) -> Option<String> {
        resolution.into_source().map(|s| s.text())
    }

    #[test]
    fn test_named_strategy_boundary() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Named, Some("1.0"));
        let v1 = format!("{BASE_HREF}1.0/html/chunk.xsl");
        let v2 = format!("{BASE_HREF}2.0/html/chunk.xsl");

        assert_eq!(text(resolver.resolve_uri(&v1, "").unwrap()).as_deref(), Some("chunk"));
        assert_eq!(resolver.resolve_uri(&v2, "").unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_inclusive_strategy_accepts_any_version() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Inclusive, Some("1.0"));
        for version in ["1.0", "2.0", "current"] {
            let href = format!("{BASE_HREF}{version}/html/chunk.xsl");
            assert_eq!(text(resolver.resolve_uri(&href, "").unwrap()).as_deref(), Some("chunk"));
        }
    }

    #[test]
    fn test_named_strategy_defaults_to_current() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Named, None);
        let current = format!("{BASE_HREF}current/html/chunk.xsl");
        let pinned = format!("{BASE_HREF}1.79.1/html/chunk.xsl");
        assert!(resolver.resolve_uri(&current, "").unwrap().is_resolved());
        assert!(!resolver.resolve_uri(&pinned, "").unwrap().is_resolved());
    }

    #[test]
    fn test_relative_href_against_versioned_base() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Inclusive, None);
        let base = format!("{BASE_HREF}current/html/chunk.xsl");

        assert_eq!(text(resolver.resolve_uri("chunker.xsl", &base).unwrap()).as_deref(), Some("chunker"));
        assert_eq!(text(resolver.resolve_uri("../common/common.xsl", &base).unwrap()).as_deref(), Some("common"));
        assert_eq!(resolver.resolve_uri("classpath:/html/chunker.xsl", &base).unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_missing_packaged_stylesheet_declines() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Inclusive, None);
        let href = format!("{BASE_HREF}current/fo/docbook.xsl");
        assert_eq!(resolver.resolve_uri(&href, "").unwrap(), Resolution::Declined);
        assert_eq!(resolver.resolve_uri("html/chunk.xsl", "file:///doc/").unwrap(), Resolution::Declined);
    }

    #[test]
    fn test_resolved_source_carries_packaged_url() {
        let resolver = VersionResolver::new(locator(), XsltResolutionStrategy::Inclusive, None);
        let href = format!("{BASE_HREF}current/html/chunk.xsl");
        let source = resolver.resolve_uri(&href, "").unwrap().into_source().unwrap();
        assert_eq!(source.system_id.as_deref(), Some("memory:/html/chunk.xsl"));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("INCLUSIVE".parse::<XsltResolutionStrategy>().unwrap(), XsltResolutionStrategy::Inclusive);
        assert!("loose".parse::<XsltResolutionStrategy>().is_err());
        assert_eq!(XsltResolutionStrategy::default(), XsltResolutionStrategy::Named);
    }
}
