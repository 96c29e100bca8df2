use crate::open_packaged;
use crate::schema::{LEGACY_SYSTEM_ID_PREFIX, split_versioned};
use docweave_resource::ResourceLocator;
use docweave_traits::{EntityResolver, Resolution, ResolveError};
use log::trace;
use std::sync::Arc;

/// Maps legacy OASIS DocBook system identifiers to the packaged
/// `docbook/xml/{version}/{name}` resources, keeping the version.
#[derive(Debug, Clone)]
pub struct LocalDocBookEntityResolver {
    locator: Arc<ResourceLocator>,
}

impl LocalDocBookEntityResolver {
    pub fn new(locator: Arc<ResourceLocator>) -> Self {
        Self { locator }
    }
}

impl EntityResolver for LocalDocBookEntityResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        let Some(requested) = system_id else {
            return Ok(Resolution::Declined);
        };
        let Some((version, name)) = split_versioned(requested, LEGACY_SYSTEM_ID_PREFIX) else {
            return Ok(Resolution::Declined);
        };
        let resource = format!("docbook/xml/{version}/{name}");
        trace!("legacy entity [{requested}] -> [{resource}]");
        Ok(open_packaged(&self.locator, &resource)?
            .map(|source| source.with_public_id(public_id).with_system_id(Some(requested)))
            .into())
    }
}
