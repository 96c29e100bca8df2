// src/profile.rs
//! DocBook profiling: filtering a document down to one language or one
//! value of a profiling attribute.

use crate::config::Configuration;
use crate::error::DocweaveError;
use crate::source::build_document_source;
use crate::transform::TransformerBuilder;
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Packaged profiling stylesheet.
pub const PROFILE_STYLESHEET: &str = "profiling/profile.xsl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilingSource {
    /// Locale, e.g. `en_US`.
    pub language: String,
    pub document: PathBuf,
    pub profiled_document: PathBuf,
}

#[derive(Debug)]
pub struct Profiler {
    configuration: Arc<Configuration>,
    transformer_builder: Arc<TransformerBuilder>,
}

impl Profiler {
    pub fn new(configuration: Arc<Configuration>, transformer_builder: Arc<TransformerBuilder>) -> Self {
        Self {
            configuration,
            transformer_builder,
        }
    }

    /// Writes the profiled document and returns its path.
    pub fn profile(&self, source: &ProfilingSource) -> Result<PathBuf, DocweaveError> {
        let target = &source.profiled_document;
        info!("applying DocBook profiling [{}]", target.display());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let language = self.configuration.render_locale(&source.language);
        let mut transformer = self.transformer_builder.build_standard_transformer(PROFILE_STYLESHEET)?;
        transformer.set_parameter("l10n.gentext.language", &language);

        let profiling = &self.configuration.profiling;
        match profiling.attribute_name.as_deref() {
            None | Some("lang") => {
                transformer.set_parameter("profile.attribute", "lang");
                transformer.set_parameter("profile.lang", &language);
            }
            Some(attribute) => {
                transformer.set_parameter("profile.attribute", attribute);
                transformer.set_parameter("profile.value", profiling.attribute_value.as_deref().unwrap_or_default());
            }
        }

        let document = build_document_source(
            &source.document,
            self.transformer_builder.resolvers().entity_resolver(),
            &self.configuration.value_injections,
        )?;
        let mut output = BufWriter::new(File::create(target)?);
        transformer.transform(&document, &mut output).map_err(|e| {
            DocweaveError::stylesheet(PROFILE_STYLESHEET, format!("error performing profiling: {e}"))
        })?;
        output.flush()?;
        Ok(target.clone())
    }
}
