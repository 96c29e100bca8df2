//! Resolvers for the docweave pipeline.
//!
//! Every reference a transformation makes to a schema, a stylesheet or an
//! included fragment goes through one of two chains built from the
//! resolvers in this crate:
//!
//! - the **reference chain** ([`UriResolverChain`]): version resolver,
//!   archive-relative resolver, classpath resolver, catalog resolver
//! - the **document entity chain** ([`EntityResolverChain`]): XInclude
//!   resolver, local schema resolver, local DocBook entity resolver,
//!   catalog resolver
//!
//! Resolvers decline anything they do not recognise. Only genuine I/O
//! failures are reported as errors.

pub mod catalog;
mod chain;
mod classpath;
mod entity;
mod relative_archive;
mod schema;
mod version;
mod xinclude;

pub use catalog::{Catalog, CatalogResolver, CatalogSet};
pub use chain::{EntityResolverChain, UriResolverChain, expand_system_id};
pub use classpath::ClasspathResolver;
pub use entity::LocalDocBookEntityResolver;
pub use relative_archive::RelativeArchiveResolver;
pub use schema::{
    DOCBOOK_PUBLIC_ID, LEGACY_SYSTEM_ID_PREFIX, LocalSchemaResolver, SYSTEM_ID_PREFIX, SchemaFlavor,
};
pub use version::{BASE_HREF, VersionResolver, XsltResolutionStrategy};
pub use xinclude::{ValueInjection, XIncludeEntityResolver, injected_entity_subset};

pub use docweave_traits::{EntityRequest, EntityResolver, Resolution, ResolveError, ResolvedSource, UriResolver};

use docweave_resource::{ResourceLocation, ResourceLocator};
use log::debug;

/// Opens a located resource. A location that turns out not to exist is a
/// decline.
pub(crate) fn open_location(location: &ResourceLocation) -> Result<Option<ResolvedSource>, ResolveError> {
    match location.open() {
        Ok(data) => Ok(Some(ResolvedSource::new(location.url(), data))),
        Err(e) if e.is_unavailable() => {
            debug!("[{}] could not be opened: {}", location.url(), e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Opens a packaged resource by name, declining when it is not packaged.
pub(crate) fn open_packaged(locator: &ResourceLocator, name: &str) -> Result<Option<ResolvedSource>, ResolveError> {
    match locator.locate_classpath_resource(name) {
        Some(location) => open_location(&location),
        None => {
            debug!("packaged resource [{name}] not found");
            Ok(None)
        }
    }
}
