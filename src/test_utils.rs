//! In-crate fakes shared by unit tests.

use docweave_engine::{
    BufferedSink, CompiledStylesheet, EngineError, MessageSink, Parameters, StylesheetCompiler, TransformSource, Transformer,
    TransformerSettings,
};
use docweave_resource::ResourceLocator;
use docweave_traits::{InMemoryResourceProvider, ResolvedSource, ResourceProvider, UriResolver};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Compiles anything that does not contain `<broken`, counting compilations.
///
/// Its transformers start out reporting to one shared engine sink, the way
/// a real engine writes to its console until told otherwise.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    compiled: AtomicUsize,
    engine_sink: Arc<BufferedSink>,
}

impl CountingCompiler {
    pub fn compilations(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }

    /// Messages that reached the engine's own sink.
    pub fn engine_messages(&self) -> Vec<String> {
        self.engine_sink.messages()
    }
}

impl StylesheetCompiler for CountingCompiler {
    fn compile(
        &self,
        stylesheet: &ResolvedSource,
        _uri_resolver: Arc<dyn UriResolver>,
    ) -> Result<Arc<dyn CompiledStylesheet>, EngineError> {
        self.compiled.fetch_add(1, Ordering::SeqCst);
        let system_id = stylesheet.system_id.clone();
        if stylesheet.text().contains("<broken") {
            return Err(EngineError::Compile {
                system_id: system_id.unwrap_or_default(),
                message: "not a stylesheet".to_string(),
            });
        }
        Ok(Arc::new(FakeStylesheet {
            system_id,
            engine_sink: Arc::clone(&self.engine_sink),
        }))
    }
}

#[derive(Debug)]
pub struct FakeStylesheet {
    system_id: Option<String>,
    engine_sink: Arc<BufferedSink>,
}

impl CompiledStylesheet for FakeStylesheet {
    fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    fn new_transformer(&self) -> Result<Box<dyn Transformer>, EngineError> {
        let mut transformer = EchoTransformer::default();
        transformer.settings.message_sink = Some(self.engine_sink.clone());
        Ok(Box::new(transformer))
    }
}

/// Writes its parameters (`name=value` lines) followed by the source, and
/// reports each transformation to its message sink.
#[derive(Debug, Default)]
pub struct EchoTransformer {
    settings: TransformerSettings,
}

impl Transformer for EchoTransformer {
    fn set_parameter(&mut self, name: &str, value: &str) {
        self.settings.set_parameter(name, value);
    }

    fn parameter(&self, name: &str) -> Option<&str> {
        self.settings.parameter(name)
    }

    fn parameters(&self) -> &Parameters {
        &self.settings.parameters
    }

    fn set_uri_resolver(&mut self, resolver: Arc<dyn UriResolver>) {
        self.settings.uri_resolver = Some(resolver);
    }

    fn uri_resolver(&self) -> Option<Arc<dyn UriResolver>> {
        self.settings.uri_resolver.clone()
    }

    fn set_message_sink(&mut self, sink: Arc<dyn MessageSink>) {
        self.settings.message_sink = Some(sink);
    }

    fn transform(&mut self, source: &TransformSource, output: &mut dyn Write) -> Result<(), EngineError> {
        self.settings.emit("transforming");
        for (name, value) in &self.settings.parameters {
            writeln!(output, "{name}={value}")?;
        }
        output.write_all(&source.data)?;
        Ok(())
    }
}

/// A locator over one in-memory root holding `entries`.
pub fn memory_locator(entries: &[(&str, &str)]) -> Arc<ResourceLocator> {
    let provider = InMemoryResourceProvider::new();
    for (name, content) in entries {
        provider.add(*name, *content).unwrap();
    }
    let root: Arc<dyn ResourceProvider> = Arc::new(provider);
    Arc::new(ResourceLocator::new().with_root(root))
}
