//! The two resolution protocols.
//!
//! Entity resolution maps a `(publicId, systemId)` pair (optionally with a
//! name and base URI) to content; reference resolution maps an
//! `(href, base)` pair to content. Both return [`Resolution`]: a resolver
//! that does not recognise a request declines, it never fails. Only genuine
//! I/O problems surface as [`ResolveError`].

use crate::resource::{ResourceError, SharedResourceData};
use std::fmt::{self, Debug};
use thiserror::Error;

/// Hard failure while resolving. "Not my pattern" is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("I/O error resolving [{id}]: {message}")]
    Io { id: String, message: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Resolved content plus its identity.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// System identifier (URL) the content should be known by.
    pub system_id: Option<String>,
    pub public_id: Option<String>,
    pub data: SharedResourceData,
}

impl ResolvedSource {
    pub fn new(system_id: impl Into<String>, data: SharedResourceData) -> Self {
        Self {
            system_id: Some(system_id.into()),
            public_id: None,
            data,
        }
    }

    /// Content with no identity, e.g. a generated external subset.
    pub fn anonymous(data: impl Into<Vec<u8>>) -> Self {
        Self {
            system_id: None,
            public_id: None,
            data: SharedResourceData::new(data.into()),
        }
    }

    pub fn with_public_id(mut self, public_id: Option<&str>) -> Self {
        self.public_id = public_id.map(str::to_string);
        self
    }

    pub fn with_system_id(mut self, system_id: Option<&str>) -> Self {
        self.system_id = system_id.map(str::to_string);
        self
    }

    /// The content as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl Debug for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("system_id", &self.system_id)
            .field("public_id", &self.public_id)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Outcome of asking a single resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not applicable, or the matched local resource does not exist.
    Declined,
    Resolved(ResolvedSource),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn into_source(self) -> Option<ResolvedSource> {
        match self {
            Resolution::Resolved(source) => Some(source),
            Resolution::Declined => None,
        }
    }

    pub fn source(&self) -> Option<&ResolvedSource> {
        match self {
            Resolution::Resolved(source) => Some(source),
            Resolution::Declined => None,
        }
    }
}

impl From<Option<ResolvedSource>> for Resolution {
    fn from(source: Option<ResolvedSource>) -> Self {
        source.map_or(Resolution::Declined, Resolution::Resolved)
    }
}

/// An entity resolution request in its extended form.
///
/// Basic requests carry only the public and system identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityRequest<'a> {
    pub name: Option<&'a str>,
    pub public_id: Option<&'a str>,
    pub base_uri: Option<&'a str>,
    pub system_id: Option<&'a str>,
}

impl<'a> EntityRequest<'a> {
    pub fn basic(public_id: Option<&'a str>, system_id: Option<&'a str>) -> Self {
        Self {
            name: None,
            public_id,
            base_uri: None,
            system_id,
        }
    }

    pub fn extended(
        name: Option<&'a str>,
        public_id: Option<&'a str>,
        base_uri: Option<&'a str>,
        system_id: Option<&'a str>,
    ) -> Self {
        Self {
            name,
            public_id,
            base_uri,
            system_id,
        }
    }
}

/// Entity resolution: public/system identifier to content.
///
/// Every resolver implements the basic form. Resolvers that understand the
/// extended context (entity name and base URI) report it through
/// [`EntityResolver::supports_extended`]; chains hand basic-only resolvers a
/// system identifier already expanded against the base URI.
pub trait EntityResolver: Send + Sync + Debug {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError>;

    fn supports_extended(&self) -> bool {
        false
    }

    /// Extended form. Only called when `supports_extended` is true.
    fn resolve_entity_extended(&self, request: &EntityRequest<'_>) -> Result<Resolution, ResolveError> {
        self.resolve_entity(request.public_id, request.system_id)
    }

    /// Supplies an external subset for a document that declares none.
    fn external_subset(&self, _name: &str, _base_uri: Option<&str>) -> Result<Resolution, ResolveError> {
        Ok(Resolution::Declined)
    }
}

/// Reference resolution: `(href, base)` to content.
pub trait UriResolver: Send + Sync + Debug {
    fn resolve_uri(&self, href: &str, base: &str) -> Result<Resolution, ResolveError>;
}
