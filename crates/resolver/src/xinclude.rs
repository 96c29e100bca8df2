//! Value injection into included documents.
//!
//! Injected values become general entity declarations
//! (`<!ENTITY name "value">`) that are made visible to every document of
//! a build: as a generated external subset for documents without a DOCTYPE,
//! and prepended to local `.ent` files referenced from a document.

use docweave_resource::{Uri, file_url, file_url_to_path};
use docweave_traits::{EntityRequest, EntityResolver, Resolution, ResolveError, ResolvedSource};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// A named value made available to documents as a general entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueInjection {
    pub name: String,
    pub value: String,
}

impl ValueInjection {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Entity declarations for `injections`, one per line.
pub fn injected_entity_subset(injections: &[ValueInjection]) -> String {
    injections
        .iter()
        .map(|injection| format!("<!ENTITY {} \"{}\">\n", injection.name, injection.value.replace('"', "&#34;")))
        .collect()
}

/// Extended-capable entity resolver applying value injections.
///
/// Declines everything when no injections are configured.
#[derive(Debug, Clone, Default)]
pub struct XIncludeEntityResolver {
    injections: Vec<ValueInjection>,
}

impl XIncludeEntityResolver {
    pub fn new(injections: Vec<ValueInjection>) -> Self {
        Self { injections }
    }

    pub fn injections(&self) -> &[ValueInjection] {
        &self.injections
    }

    fn injected_entity_file(&self, base_uri: &str, system_id: &str) -> Result<Resolution, ResolveError> {
        let Some(base_path) = file_url_to_path(base_uri).filter(|p| p.exists()) else {
            return Ok(Resolution::Declined);
        };
        let directory = base_path.parent().unwrap_or(base_path.as_path());
        let relative = system_id.trim();
        let entity_path = match Uri::parse(relative) {
            Ok(uri) if uri.scheme() == Some("file") => file_url_to_path(relative).unwrap_or_else(|| directory.join(relative)),
            _ => directory.join(relative),
        };

        let mut content = injected_entity_subset(&self.injections);
        match std::fs::read_to_string(&entity_path) {
            Ok(text) => content.push_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("referenced ENT file not found: {}", entity_path.display());
            }
            Err(e) => {
                return Err(ResolveError::Io {
                    id: entity_path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
        Ok(Resolution::Resolved(ResolvedSource::new(
            file_url(&entity_path),
            content.into_bytes().into(),
        )))
    }
}

impl EntityResolver for XIncludeEntityResolver {
    fn resolve_entity(&self, public_id: Option<&str>, system_id: Option<&str>) -> Result<Resolution, ResolveError> {
        self.resolve_entity_extended(&EntityRequest::basic(public_id, system_id))
    }

    fn supports_extended(&self) -> bool {
        true
    }

    fn resolve_entity_extended(&self, request: &EntityRequest<'_>) -> Result<Resolution, ResolveError> {
        trace!(
            "resolving entity; name=[{:?}]; publicId=[{:?}]; baseURI=[{:?}]; systemId=[{:?}]",
            request.name, request.public_id, request.base_uri, request.system_id
        );
        if self.injections.is_empty() {
            return Ok(Resolution::Declined);
        }
        match (request.public_id, request.base_uri, request.system_id) {
            (None, Some(base_uri), Some(system_id))
                if base_uri.starts_with("file:") && system_id.trim().ends_with(".ent") =>
            {
                self.injected_entity_file(base_uri, system_id)
            }
            _ => Ok(Resolution::Declined),
        }
    }

    fn external_subset(&self, name: &str, base_uri: Option<&str>) -> Result<Resolution, ResolveError> {
        trace!("generating external subset; name=[{name}]; baseURI=[{base_uri:?}]");
        if self.injections.is_empty() {
            return Ok(Resolution::Declined);
        }
        Ok(Resolution::Resolved(ResolvedSource::anonymous(injected_entity_subset(&self.injections))))
    }
}
