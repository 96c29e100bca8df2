// src/render.rs
//! Rendering a document into one output format.

use crate::config::{Configuration, Environment};
use crate::error::DocweaveError;
use crate::format::{FormatOptions, FormatPlan, FormatPlanBuilder};
use crate::source::build_document_source;
use crate::transform::TransformerBuilder;
use docweave_engine::{EngineError, TransformSource};
use log::{debug, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Turns XSL-FO into paginated output (PDF).
pub trait PaginatedFormatter: Send + Sync + fmt::Debug {
    fn format(&self, xsl_fo: &[u8], target: &Path, font_directories: &[PathBuf]) -> Result<(), DocweaveError>;
}

/// One document in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingSource {
    /// Locale, e.g. `en_US`.
    pub language: String,
    pub source_document: PathBuf,
    /// Per-format output directories are created below this one.
    pub publishing_base_directory: PathBuf,
    pub xsl_fo_directory: PathBuf,
}

#[derive(Debug)]
pub struct Renderer {
    environment: Arc<Environment>,
    configuration: Arc<Configuration>,
    transformer_builder: Arc<TransformerBuilder>,
    formatter: Option<Arc<dyn PaginatedFormatter>>,
}

impl Renderer {
    pub fn new(
        environment: Arc<Environment>,
        configuration: Arc<Configuration>,
        transformer_builder: Arc<TransformerBuilder>,
    ) -> Self {
        Self {
            environment,
            configuration,
            transformer_builder,
            formatter: None,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn PaginatedFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Renders `source` into the format named by `options`.
    ///
    /// Returns the main output file, or `None` when the source document
    /// does not exist and the render was skipped.
    pub fn render(&self, source: &RenderingSource, options: &FormatOptions) -> Result<Option<PathBuf>, DocweaveError> {
        let language = self.configuration.render_locale(&source.language);
        let plan = FormatPlanBuilder::build(options)?;
        info!("Starting rendering {}/{}", language, plan.name());

        let formatter = match (plan.is_paginated(), &self.formatter) {
            (true, None) => {
                return Err(DocweaveError::Config(format!(
                    "format [{}] needs a paginated formatter and none is configured",
                    plan.name()
                )));
            }
            (true, Some(formatter)) => Some(Arc::clone(formatter)),
            (false, _) => None,
        };

        if !source.source_document.exists() {
            warn!("Source document {} did not exist; skipping", source.source_document.display());
            return Ok(None);
        }

        let target_directory = source.publishing_base_directory.join(plan.name());
        fs::create_dir_all(&target_directory)?;

        if plan.requires_image_copying() {
            self.copy_staged_resources(&target_directory)?;
        }

        let target_file = target_directory.join(plan.target_file_name(&source.source_document));
        if target_file.exists() {
            fs::remove_file(&target_file)?;
        }

        let stylesheet = self.environment.locator().require_resource(plan.stylesheet_resource())?;
        let mut transformer = self
            .transformer_builder
            .build_format_transformer(&plan, &stylesheet, &target_file)?;
        transformer.set_parameter("l10n.gentext.language", &language);

        let console_log = self.console_log_file(&language, &plan);
        if let Some(parent) = console_log.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("console output for {}/{} goes to {}", language, plan.name(), console_log.display());

        let document = self.document_source(&source.source_document)?;
        let failed = |e: EngineError| DocweaveError::Stylesheet {
            url: stylesheet.url().to_string(),
            message: format!("error rendering {}: {}", source.source_document.display(), e),
        };
        match formatter {
            Some(formatter) => {
                let mut xsl_fo = Vec::new();
                transformer.transform(&document, &mut xsl_fo).map_err(failed)?;
                formatter.format(&xsl_fo, &target_file, self.environment.font_directories())?;
            }
            None => {
                let mut output = BufWriter::new(File::create(&target_file)?);
                transformer.transform(&document, &mut output).map_err(failed)?;
                output.flush()?;
            }
        }
        Ok(Some(target_file))
    }

    /// Runs the format's transformation and keeps the XSL-FO as
    /// `{xsl_fo_directory}/{stem}.fo`.
    pub fn generate_xsl_fo(&self, source: &RenderingSource, options: &FormatOptions) -> Result<PathBuf, DocweaveError> {
        let plan = FormatPlanBuilder::build(options)?;
        let stem = source
            .source_document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fo = source.xsl_fo_directory.join(format!("{stem}.fo"));
        fs::create_dir_all(&source.xsl_fo_directory)?;

        let stylesheet = self.environment.locator().require_resource(plan.stylesheet_resource())?;
        let mut transformer = self.transformer_builder.build_format_transformer(&plan, &stylesheet, &fo)?;
        let language = self.configuration.render_locale(&source.language);
        transformer.set_parameter("l10n.gentext.language", &language);

        let document = self.document_source(&source.source_document)?;
        let mut output = BufWriter::new(File::create(&fo)?);
        transformer
            .transform(&document, &mut output)
            .map_err(|e| DocweaveError::stylesheet(stylesheet.url(), format!("Unable to apply FO transformation: {e}")))?;
        output.flush()?;
        Ok(fo)
    }

    /// `{work}/log/console-{language}-{format}.log`
    pub fn console_log_file(&self, language: &str, plan: &FormatPlan) -> PathBuf {
        self.environment
            .work_directory()
            .join("log")
            .join(format!("console-{}-{}.log", language, plan.name()))
    }

    fn document_source(&self, file: &Path) -> Result<TransformSource, DocweaveError> {
        build_document_source(
            file,
            self.transformer_builder.resolvers().entity_resolver(),
            &self.configuration.value_injections,
        )
    }

    fn copy_staged_resources(&self, target_directory: &Path) -> Result<(), DocweaveError> {
        let staging = self.environment.staging_directory();
        for name in ["images", "css"] {
            let staged = staging.join(name);
            if staged.is_dir() {
                copy_directory_structure(&staged, target_directory)?;
            }
        }
        Ok(())
    }
}

/// Copies the contents of `source` into `destination`, keeping the
/// directory structure below `source`.
fn copy_directory_structure(source: &Path, destination: &Path) -> Result<(), DocweaveError> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
