// src/components.rs
//! Per-build wiring of the shared components.

use crate::config::{Configuration, Environment};
use crate::profile::Profiler;
use crate::render::{PaginatedFormatter, Renderer};
use crate::transform::{TemplateCache, TransformerBuilder};
use docweave_engine::StylesheetCompiler;
use std::sync::Arc;

/// Owns everything one build shares: the environment, the configuration
/// and a single transformer builder (and with it the template cache and
/// the catalog resolver).
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    environment: Arc<Environment>,
    configuration: Arc<Configuration>,
    transformer_builder: Arc<TransformerBuilder>,
}

impl ComponentRegistry {
    pub fn new(environment: Environment, configuration: Configuration, compiler: Arc<dyn StylesheetCompiler>) -> Self {
        let environment = Arc::new(environment);
        let configuration = Arc::new(configuration);
        let transformer_builder = Arc::new(TransformerBuilder::new(
            Arc::clone(&environment),
            Arc::clone(&configuration),
            compiler,
        ));
        Self {
            environment,
            configuration,
            transformer_builder,
        }
    }

    /// Like [`ComponentRegistry::new`], compiling into an existing cache.
    pub fn with_template_cache(
        environment: Environment,
        configuration: Configuration,
        compiler: Arc<dyn StylesheetCompiler>,
        cache: Arc<TemplateCache>,
    ) -> Self {
        let environment = Arc::new(environment);
        let configuration = Arc::new(configuration);
        let transformer_builder = Arc::new(
            TransformerBuilder::new(Arc::clone(&environment), Arc::clone(&configuration), compiler)
                .with_template_cache(cache),
        );
        Self {
            environment,
            configuration,
            transformer_builder,
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn transformer_builder(&self) -> &Arc<TransformerBuilder> {
        &self.transformer_builder
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(
            Arc::clone(&self.environment),
            Arc::clone(&self.configuration),
            Arc::clone(&self.transformer_builder),
        )
    }

    pub fn renderer_with_formatter(&self, formatter: Arc<dyn PaginatedFormatter>) -> Renderer {
        self.renderer().with_formatter(formatter)
    }

    pub fn profiler(&self) -> Profiler {
        Profiler::new(Arc::clone(&self.configuration), Arc::clone(&self.transformer_builder))
    }

    /// `locale` in the configured rendering, e.g. `en_US` as `en-US`.
    pub fn to_language_string(&self, locale: &str) -> String {
        self.configuration.render_locale(locale)
    }
}
