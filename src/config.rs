// src/config.rs
//! Build configuration and execution environment.
//!
//! [`Configuration`] is what the user declares (usually loaded from JSON);
//! [`Environment`] is what the embedding build supplies at runtime.

use crate::error::DocweaveError;
use docweave_resolver::{SchemaFlavor, ValueInjection, XsltResolutionStrategy};
use docweave_resource::ResourceLocator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Profiling (conditional text) options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profiling {
    pub enabled: bool,
    /// Attribute to profile on. `None` and `"lang"` both mean profiling by
    /// language.
    pub attribute_name: Option<String>,
    pub attribute_value: Option<String>,
}

/// User-declared build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Extra stylesheet parameters, applied to every transformer.
    pub transformer_parameters: BTreeMap<String, String>,
    pub use_relative_image_uris: bool,
    pub locale_separator: char,
    pub value_injections: Vec<ValueInjection>,
    /// Explicit catalogs. Empty means implicit catalog discovery.
    pub catalogs: Vec<String>,
    pub profiling: Profiling,
    /// Stylesheet distribution version matched by the named resolution
    /// strategy.
    pub docbook_version: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            transformer_parameters: BTreeMap::new(),
            use_relative_image_uris: true,
            locale_separator: '-',
            value_injections: Vec::new(),
            catalogs: Vec::new(),
            profiling: Profiling::default(),
            docbook_version: None,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, DocweaveError> {
        let mut configuration: Configuration = serde_json::from_str(json)?;
        configuration.dedupe_catalogs();
        Ok(configuration)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DocweaveError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            DocweaveError::Config(format!("Failed to read configuration from '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_transformer_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.transformer_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_value_injection(mut self, injection: ValueInjection) -> Self {
        self.value_injections.push(injection);
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalogs.push(catalog.into());
        self.dedupe_catalogs();
        self
    }

    pub fn with_docbook_version(mut self, version: impl Into<String>) -> Self {
        self.docbook_version = Some(version.into());
        self
    }

    /// Renders a locale (`en_US`, `en-US`, `en`) with the configured
    /// separator.
    pub fn render_locale(&self, locale: &str) -> String {
        render_locale(locale, self.locale_separator)
    }

    fn dedupe_catalogs(&mut self) {
        let mut seen = HashSet::new();
        self.catalogs.retain(|catalog| seen.insert(catalog.clone()));
    }
}

pub fn render_locale(locale: &str, separator: char) -> String {
    locale
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// The execution environment a build runs in.
#[derive(Debug, Clone)]
pub struct Environment {
    locator: Arc<ResourceLocator>,
    work_directory: PathBuf,
    staging_directory: PathBuf,
    font_directories: Vec<PathBuf>,
    xslt_strategy: XsltResolutionStrategy,
    schema_flavor: SchemaFlavor,
}

impl Environment {
    /// The staging directory defaults to `{work}/staging`.
    pub fn new<P: AsRef<Path>>(locator: Arc<ResourceLocator>, work_directory: P) -> Self {
        let work_directory = work_directory.as_ref().to_path_buf();
        Self {
            locator,
            staging_directory: work_directory.join("staging"),
            work_directory,
            font_directories: Vec::new(),
            xslt_strategy: XsltResolutionStrategy::default(),
            schema_flavor: SchemaFlavor::default(),
        }
    }

    pub fn with_staging_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.staging_directory = path.as_ref().to_path_buf();
        self
    }

    pub fn with_font_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.font_directories.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_xslt_strategy(mut self, strategy: XsltResolutionStrategy) -> Self {
        self.xslt_strategy = strategy;
        self
    }

    pub fn with_schema_flavor(mut self, flavor: SchemaFlavor) -> Self {
        self.schema_flavor = flavor;
        self
    }

    pub fn locator(&self) -> &Arc<ResourceLocator> {
        &self.locator
    }

    pub fn work_directory(&self) -> &Path {
        &self.work_directory
    }

    pub fn staging_directory(&self) -> &Path {
        &self.staging_directory
    }

    pub fn font_directories(&self) -> &[PathBuf] {
        &self.font_directories
    }

    pub fn xslt_strategy(&self) -> XsltResolutionStrategy {
        self.xslt_strategy
    }

    pub fn schema_flavor(&self) -> SchemaFlavor {
        self.schema_flavor
    }
}
