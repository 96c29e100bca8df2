use crate::open_location;
use docweave_resource::{CLASSPATH_SCHEME, ResourceLocator};
use docweave_traits::{Resolution, ResolveError, UriResolver};
use log::debug;
use std::sync::Arc;

/// Resolves `classpath:` references against the resource roots.
///
/// Any other scheme is declined, as is a `classpath:` reference to an
/// entry that no root contains.
#[derive(Debug, Clone)]
pub struct ClasspathResolver {
    locator: Arc<ResourceLocator>,
}

impl ClasspathResolver {
    pub fn new(locator: Arc<ResourceLocator>) -> Self {
        Self { locator }
    }
}

impl UriResolver for ClasspathResolver {
    fn resolve_uri(&self, href: &str, _base: &str) -> Result<Resolution, ResolveError> {
        if !href.starts_with(CLASSPATH_SCHEME) {
            return Ok(Resolution::Declined);
        }
        match self.locator.locate_resource(href)? {
            Some(location) => Ok(open_location(&location)?.into()),
            None => {
                debug!("unable to resolve requested classpath URL [{href}]");
                Ok(Resolution::Declined)
            }
        }
    }
}
