//! docweave: offline, version-pinned resource resolution and format-plan
//! driven stylesheet transformation for document builds.
//!
//! Every schema, stylesheet and included fragment a build references is
//! resolved locally through two resolver chains (see [`resolution`]). A
//! [`format::FormatPlan`] describes how one output format is produced, and
//! the [`transform::TransformerBuilder`] turns plans into configured
//! transformers, compiling each stylesheet once per build.
//!
//! ```no_run
//! use docweave::{ComponentRegistry, Configuration, Environment, FormatOptions, RenderingSource};
//! use docweave::resource::ResourceLocator;
//! use std::sync::Arc;
//!
//! # fn run(compiler: Arc<dyn docweave::engine::StylesheetCompiler>) -> Result<(), docweave::DocweaveError> {
//! let mut locator = ResourceLocator::new();
//! locator.add_path("resources/docbook-xsl.jar")?;
//! let environment = Environment::new(Arc::new(locator), "target/work");
//! let registry = ComponentRegistry::new(environment, Configuration::default(), compiler);
//!
//! let source = RenderingSource {
//!     language: "en_US".to_string(),
//!     source_document: "en-US/Guide.xml".into(),
//!     publishing_base_directory: "target/publish/en-US".into(),
//!     xsl_fo_directory: "target/work/xsl-fo/en-US".into(),
//! };
//! registry.renderer().render(&source, &FormatOptions::new("html"))?;
//! # Ok(())
//! # }
//! ```

pub mod components;
pub mod config;
pub mod error;
pub mod format;
pub mod inclusion;
pub mod profile;
pub mod render;
pub mod resolution;
pub mod source;
pub mod transform;

#[cfg(test)]
mod test_utils;

pub use components::ComponentRegistry;
pub use config::{Configuration, Environment, Profiling, render_locale};
pub use error::DocweaveError;
pub use format::{FormatMetadata, FormatOptions, FormatPlan, FormatPlanBuilder};
pub use inclusion::{determine_relativity, find_all_inclusion_files, locate_inclusions};
pub use profile::{Profiler, ProfilingSource};
pub use render::{PaginatedFormatter, Renderer, RenderingSource};
pub use resolution::ResolverSet;
pub use transform::{TemplateCache, TransformerBuilder};

pub use docweave_engine as engine;
pub use docweave_resolver as resolver;
pub use docweave_resource as resource;
pub use docweave_traits as traits;
