//! Local resolution of DocBook schema references.
//!
//! Schema references are answered from the packaged `docbook/{flavor}/`
//! resources so that validation never touches the network. Two rules are
//! combined in one chain: the DocBook public identifier selects the main
//! schema of the configured flavor, and versioned system identifiers map
//! `{prefix}/{version}/{name}` to `docbook/{flavor}/{name}`.

use crate::chain::EntityResolverChain;
use crate::open_packaged;
use docweave_resource::ResourceLocator;
use docweave_traits::{EntityRequest, EntityResolver, Resolution, ResolveError, ResolvedSource};
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Canonical public identifier of the DocBook 5 family.
pub const DOCBOOK_PUBLIC_ID: &str = "http://docbook.org/ns/docbook";

/// Prefix of versioned schema system identifiers.
pub const SYSTEM_ID_PREFIX: &str = "http://docbook.org/xml/";

/// Prefix of the older OASIS-rooted DTD system identifiers.
pub const LEGACY_SYSTEM_ID_PREFIX: &str = "http://www.oasis-open.org/docbook/xml/";

/// The five interchangeable representations of the DocBook grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFlavor {
    Dtd,
    Xsd,
    #[default]
    Rng,
    Rnc,
    Sch,
}

impl SchemaFlavor {
    pub const ALL: [SchemaFlavor; 5] = [
        SchemaFlavor::Dtd,
        SchemaFlavor::Xsd,
        SchemaFlavor::Rng,
        SchemaFlavor::Rnc,
        SchemaFlavor::Sch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaFlavor::Dtd => "dtd",
            SchemaFlavor::Xsd => "xsd",
            SchemaFlavor::Rng => "rng",
            SchemaFlavor::Rnc => "rnc",
            SchemaFlavor::Sch => "sch",
        }
    }

    /// Packaged resource name of `name` in this flavor.
    pub fn resource_name(self, name: &str) -> String {
        format!("docbook/{}/{}", self.as_str(), name.trim_start_matches('/'))
    }

    /// Name of the main schema document, e.g. `docbook.rng`.
    pub fn main_schema_name(self) -> String {
        format!("docbook.{}", self.as_str())
    }
}

impl fmt::Display for SchemaFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaFlavor::ALL
            .into_iter()
            .find(|flavor| flavor.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown schema flavor [{s}]; expected one of dtd, xsd, rng, rnc, sch"))
    }
}

/// Splits `{prefix}{version}/{name}` into `(version, name)`.
pub(crate) fn split_versioned<'a>(system_id: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    system_id.strip_prefix(prefix)?.split_once('/')
}

/// Public-identifier rule: the DocBook namespace always means the main
/// schema of the configured flavor.
#[derive(Debug)]
struct PublicIdSchemaResolver {
    flavor: SchemaFlavor,
    locator: Arc<ResourceLocator>,
}

impl EntityResolver for PublicIdSchemaResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        if public_id != Some(DOCBOOK_PUBLIC_ID) {
            return Ok(Resolution::Declined);
        }
        let name = self.flavor.resource_name(&self.flavor.main_schema_name());
        trace!("public id [{DOCBOOK_PUBLIC_ID}] -> [{name}]");
        Ok(open_packaged(&self.locator, &name)?
            .map(|source| identify(source, public_id, system_id))
            .into())
    }
}

/// System-identifier rule for one flavor and one prefix.
#[derive(Debug)]
struct SystemIdSchemaResolver {
    flavor: SchemaFlavor,
    prefix: &'static str,
    locator: Arc<ResourceLocator>,
}

impl EntityResolver for SystemIdSchemaResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        let Some((_, name)) = system_id.and_then(|s| split_versioned(s, self.prefix)) else {
            return Ok(Resolution::Declined);
        };
        let resource = self.flavor.resource_name(name);
        trace!("system id [{system_id:?}] -> [{resource}]");
        Ok(open_packaged(&self.locator, &resource)?
            .map(|source| identify(source, public_id, system_id))
            .into())
    }
}

/// Keeps the requested identifiers on the resolved source, falling back to
/// the packaged URL when no system identifier was given.
fn identify(source: ResolvedSource, public_id: Option<&str>, system_id: Option<&str>) -> ResolvedSource {
    let source = source.with_public_id(public_id);
    match system_id {
        Some(_) => source.with_system_id(system_id),
        None => source,
    }
}

/// Resolves DocBook schema references to packaged schema resources.
///
/// Consultation order: the public-identifier rule, then the system
/// identifier rule for the configured flavor, then for the remaining
/// flavors, and finally the legacy OASIS DTD prefix.
#[derive(Debug, Clone)]
pub struct LocalSchemaResolver {
    flavor: SchemaFlavor,
    chain: EntityResolverChain,
}

impl LocalSchemaResolver {
    pub fn new(flavor: SchemaFlavor, locator: Arc<ResourceLocator>) -> Self {
        let mut chain = EntityResolverChain::new(Arc::new(SystemIdSchemaResolver {
            flavor: SchemaFlavor::Dtd,
            prefix: LEGACY_SYSTEM_ID_PREFIX,
            locator: Arc::clone(&locator),
        }));
        // added in reverse: last added is consulted first
        for other in SchemaFlavor::ALL.into_iter().rev().filter(|f| *f != flavor) {
            chain.add_resolver(Arc::new(SystemIdSchemaResolver {
                flavor: other,
                prefix: SYSTEM_ID_PREFIX,
                locator: Arc::clone(&locator),
            }));
        }
        chain.add_resolver(Arc::new(SystemIdSchemaResolver {
            flavor,
            prefix: SYSTEM_ID_PREFIX,
            locator: Arc::clone(&locator),
        }));
        chain.add_resolver(Arc::new(PublicIdSchemaResolver { flavor, locator }));
        Self { flavor, chain }
    }

    pub fn flavor(&self) -> SchemaFlavor {
        self.flavor
    }
}

impl EntityResolver for LocalSchemaResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        self.chain.resolve_entity(public_id, system_id)
    }

    fn supports_extended(&self) -> bool {
        true
    }

    fn resolve_entity_extended(&self, request: &EntityRequest<'_>) -> Result<Resolution, ResolveError> {
        self.chain.resolve_entity_extended(request)
    }
}
