// src/resolution.rs
//! Assembly of the two resolver chains used by a build.
//!
//! Reference chain, in precedence order: version resolver, archive-relative
//! resolver, classpath resolver, catalog resolver (root).
//!
//! Document entity chain, in precedence order: XInclude resolver, local
//! schema resolver, local DocBook entity resolver, catalog resolver (root).

use crate::config::{Configuration, Environment};
use docweave_resolver::{
    CatalogResolver, CatalogSet, ClasspathResolver, EntityResolverChain, LocalDocBookEntityResolver,
    LocalSchemaResolver, RelativeArchiveResolver, UriResolverChain, VersionResolver, XIncludeEntityResolver,
};
use docweave_traits::{EntityResolver, UriResolver};
use log::debug;
use std::sync::Arc;

/// The resolvers of one build, assembled once and shared by every
/// transformer and document source it produces.
#[derive(Debug, Clone)]
pub struct ResolverSet {
    catalog: Arc<CatalogResolver>,
    references: Arc<UriResolverChain>,
    entities: Arc<EntityResolverChain>,
}

impl ResolverSet {
    pub fn assemble(environment: &Environment, configuration: &Configuration) -> Self {
        let locator = environment.locator();
        let catalogs = CatalogSet::for_names(Arc::clone(locator), &configuration.catalogs);
        debug!(
            "using {} catalog resolution",
            if catalogs.is_explicit() { "explicit" } else { "implicit" }
        );
        let catalog = Arc::new(CatalogResolver::new(Arc::new(catalogs)));

        let references = UriResolverChain::new(catalog.clone())
            .with_resolver(Arc::new(ClasspathResolver::new(Arc::clone(locator))))
            .with_resolver(Arc::new(RelativeArchiveResolver::new()))
            .with_resolver(Arc::new(VersionResolver::new(
                Arc::clone(locator),
                environment.xslt_strategy(),
                configuration.docbook_version.as_deref(),
            )));

        let entities = EntityResolverChain::new(catalog.clone())
            .with_resolver(Arc::new(LocalDocBookEntityResolver::new(Arc::clone(locator))))
            .with_resolver(Arc::new(LocalSchemaResolver::new(
                environment.schema_flavor(),
                Arc::clone(locator),
            )))
            .with_resolver(Arc::new(XIncludeEntityResolver::new(configuration.value_injections.clone())));

        Self {
            catalog,
            references: Arc::new(references),
            entities: Arc::new(entities),
        }
    }

    pub fn catalog_resolver(&self) -> &Arc<CatalogResolver> {
        &self.catalog
    }

    /// The reference chain, for stylesheet imports, includes and
    /// `document()` calls.
    pub fn uri_resolver(&self) -> Arc<dyn UriResolver> {
        self.references.clone()
    }

    /// The document entity chain, for the documents being transformed.
    pub fn entity_resolver(&self) -> Arc<dyn EntityResolver> {
        self.entities.clone()
    }
}
