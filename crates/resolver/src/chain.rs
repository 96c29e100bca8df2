//! Chain-of-responsibility containers for both resolution protocols.
//!
//! A chain is built around one root resolver. Resolvers added later take
//! precedence over those added earlier; the root is always consulted last.
//! The first resolver that does not decline wins, and a chain whose members
//! all decline declines itself.

use docweave_resource::{Uri, escape_illegal};
use docweave_traits::{EntityRequest, EntityResolver, Resolution, ResolveError, UriResolver};
use log::trace;
use std::collections::VecDeque;
use std::sync::Arc;

/// Ordered reference resolvers.
#[derive(Debug, Clone)]
pub struct UriResolverChain {
    resolvers: VecDeque<Arc<dyn UriResolver>>,
}

impl UriResolverChain {
    pub fn new(root: Arc<dyn UriResolver>) -> Self {
        Self {
            resolvers: VecDeque::from([root]),
        }
    }

    /// Adds `resolver` ahead of every resolver already in the chain.
    pub fn add_resolver(&mut self, resolver: Arc<dyn UriResolver>) {
        self.resolvers.push_front(resolver);
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn UriResolver>) -> Self {
        self.add_resolver(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl UriResolver for UriResolverChain {
    fn resolve_uri(&self, href: &str, base: &str) -> Result<Resolution, ResolveError> {
        trace!("resolving href=[{href}]; base=[{base}]");
        for resolver in &self.resolvers {
            let resolution = resolver.resolve_uri(href, base)?;
            if resolution.is_resolved() {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Declined)
    }
}

/// Ordered entity resolvers, bridging extended requests to basic-only
/// members.
#[derive(Debug, Clone)]
pub struct EntityResolverChain {
    resolvers: VecDeque<Arc<dyn EntityResolver>>,
}

impl EntityResolverChain {
    pub fn new(root: Arc<dyn EntityResolver>) -> Self {
        Self {
            resolvers: VecDeque::from([root]),
        }
    }

    /// Adds `resolver` ahead of every resolver already in the chain.
    pub fn add_resolver(&mut self, resolver: Arc<dyn EntityResolver>) {
        self.resolvers.push_front(resolver);
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.add_resolver(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl EntityResolver for EntityResolverChain {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        trace!("resolving entity publicId=[{public_id:?}]; systemId=[{system_id:?}]");
        for resolver in &self.resolvers {
            let resolution = resolver.resolve_entity(public_id, system_id)?;
            if resolution.is_resolved() {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Declined)
    }

    fn supports_extended(&self) -> bool {
        true
    }

    fn resolve_entity_extended(&self, request: &EntityRequest<'_>) -> Result<Resolution, ResolveError> {
        trace!(
            "resolving entity name=[{:?}]; publicId=[{:?}]; baseURI=[{:?}]; systemId=[{:?}]",
            request.name, request.public_id, request.base_uri, request.system_id
        );
        // computed at most once per request, on first use
        let mut expanded: Option<Option<String>> = None;
        for resolver in &self.resolvers {
            let resolution = if resolver.supports_extended() {
                resolver.resolve_entity_extended(request)?
            } else {
                let system_id =
                    expanded.get_or_insert_with(|| expand_system_id(request.base_uri, request.system_id));
                resolver.resolve_entity(request.public_id, system_id.as_deref())?
            };
            if resolution.is_resolved() {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Declined)
    }

    fn external_subset(&self, name: &str, base_uri: Option<&str>) -> Result<Resolution, ResolveError> {
        trace!("external subset name=[{name}]; baseURI=[{base_uri:?}]");
        for resolver in &self.resolvers {
            let resolution = resolver.external_subset(name, base_uri)?;
            if resolution.is_resolved() {
                return Ok(resolution);
            }
        }
        Ok(Resolution::Declined)
    }
}

/// Expands a system identifier against a base URI.
///
/// Characters that cannot appear in a URI (spaces, braces and the like)
/// are percent-encoded first; absolute identifiers are otherwise returned
/// unchanged. An absent or unparsable base is replaced by an empty `file`
/// URI. An identifier with an illegal scheme is passed through as is.
/// Empty identifiers expand to `None`.
pub fn expand_system_id(base_uri: Option<&str>, system_id: Option<&str>) -> Option<String> {
    let system_id = system_id.filter(|s| !s.is_empty())?;
    let escaped = escape_illegal(system_id);
    let reference = match Uri::parse(&escaped) {
        Ok(uri) if uri.is_absolute() => return Some(escaped),
        Ok(uri) => uri,
        Err(_) => return Some(system_id.to_string()),
    };
    let base = base_uri
        .filter(|b| !b.is_empty())
        .and_then(|b| Uri::parse(b).ok())
        .unwrap_or_else(Uri::empty_file);
    Some(base.resolve(&reference).normalize().to_string())
}
