use super::cache::TemplateCache;
use crate::config::{Configuration, Environment};
use crate::error::DocweaveError;
use crate::format::FormatPlan;
use crate::resolution::ResolverSet;
use docweave_engine::{CompiledStylesheet, NullSink, StylesheetCompiler, Transformer};
use docweave_resolver::CatalogResolver;
use docweave_resource::{ResourceLocation, file_url};
use docweave_traits::ResolvedSource;
use log::{debug, trace, warn};
use std::path::{MAIN_SEPARATOR, Path};
use std::sync::Arc;

/// Engine toggles set on every transformer before any user parameter.
/// User parameters cannot change them.
pub const FIXED_PARAMETERS: [(&str, &str); 2] = [("fop.extensions", "0"), ("fop1.extensions", "1")];

/// Builds configured transformers, compiling each stylesheet URL once.
#[derive(Debug)]
pub struct TransformerBuilder {
    environment: Arc<Environment>,
    configuration: Arc<Configuration>,
    compiler: Arc<dyn StylesheetCompiler>,
    resolvers: ResolverSet,
    cache: Arc<TemplateCache>,
}

impl TransformerBuilder {
    pub fn new(
        environment: Arc<Environment>,
        configuration: Arc<Configuration>,
        compiler: Arc<dyn StylesheetCompiler>,
    ) -> Self {
        let resolvers = ResolverSet::assemble(&environment, &configuration);
        Self {
            environment,
            configuration,
            compiler,
            resolvers,
            cache: Arc::new(TemplateCache::new()),
        }
    }

    /// Shares `cache` with other builders, e.g. one per language of a batch.
    pub fn with_template_cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn resolvers(&self) -> &ResolverSet {
        &self.resolvers
    }

    pub fn catalog_resolver(&self) -> &Arc<CatalogResolver> {
        self.resolvers.catalog_resolver()
    }

    pub fn template_cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Transformer for a packaged stylesheet resource (profiling and other
    /// auxiliary passes). The resource must exist.
    pub fn build_standard_transformer(&self, resource: &str) -> Result<Box<dyn Transformer>, DocweaveError> {
        let stylesheet = self.environment.locator().require_resource(resource)?;
        self.build_transformer(&stylesheet)
    }

    /// Transformer for an already located stylesheet.
    pub fn build_standard_transformer_at(
        &self,
        stylesheet: &ResourceLocation,
    ) -> Result<Box<dyn Transformer>, DocweaveError> {
        self.build_transformer(stylesheet)
    }

    /// Transformer producing `plan`'s format into `target_file`, with the
    /// image, output directory and chunking parameters the plan calls for.
    pub fn build_format_transformer(
        &self,
        plan: &FormatPlan,
        stylesheet: &ResourceLocation,
        target_file: &Path,
    ) -> Result<Box<dyn Transformer>, DocweaveError> {
        let mut transformer = self.build_transformer(stylesheet)?;

        if plan.requires_image_path() {
            let mut image_path = file_url(&self.environment.staging_directory().join("images"));
            if !image_path.ends_with('/') {
                image_path.push('/');
            }
            trace!("setting 'img.src.path' xslt parameter {image_path}");
            transformer.set_parameter("img.src.path", &image_path);
        }

        let relative_uris = if self.configuration.use_relative_image_uris { "1" } else { "0" };
        transformer.set_parameter("keep.relative.image.uris", relative_uris);

        let base_dir = target_file.parent().unwrap_or_else(|| Path::new(""));
        transformer.set_parameter("base.dir", &format!("{}{}", base_dir.display(), MAIN_SEPARATOR));
        transformer.set_parameter("manifest.in.base.dir", "1");

        if plan.does_chunking()
            && let Some(root_filename) = target_file.file_stem()
        {
            transformer.set_parameter("root.filename", &root_filename.to_string_lossy());
        }
        Ok(transformer)
    }

    fn build_transformer(&self, stylesheet: &ResourceLocation) -> Result<Box<dyn Transformer>, DocweaveError> {
        let url = stylesheet.url();
        let compiled = self.cache.get_or_compile(url, || self.compile(stylesheet))?;
        let mut transformer = compiled
            .new_transformer()
            .map_err(|e| DocweaveError::stylesheet(url, e))?;
        self.configure(transformer.as_mut());
        Ok(transformer)
    }

    fn compile(&self, stylesheet: &ResourceLocation) -> Result<Arc<dyn CompiledStylesheet>, DocweaveError> {
        let url = stylesheet.url();
        debug!("compiling stylesheet [{url}]");
        let data = stylesheet
            .open()
            .map_err(|e| DocweaveError::stylesheet(url, format!("problem opening stylesheet: {e}")))?;
        self.compiler
            .compile(&ResolvedSource::new(url, data), self.resolvers.uri_resolver())
            .map_err(|e| DocweaveError::stylesheet(url, e))
    }

    fn configure(&self, transformer: &mut dyn Transformer) {
        transformer.set_message_sink(Arc::new(NullSink));
        transformer.set_uri_resolver(self.resolvers.uri_resolver());

        for (name, value) in FIXED_PARAMETERS {
            transformer.set_parameter(name, value);
        }
        for (name, value) in &self.configuration.transformer_parameters {
            if FIXED_PARAMETERS.iter().any(|(fixed, _)| fixed == name) {
                warn!("ignoring transformer parameter [{name}]; it is fixed by the build");
                continue;
            }
            transformer.set_parameter(name, value);
        }
    }
}
