//! Shared fixtures for the integration tests: resource trees on disk,
//! stored zip archives and a counting fake transformation engine.

#![allow(dead_code)]

use docweave::engine::{
    CompiledStylesheet, EngineError, MessageSink, Parameters, StylesheetCompiler, TransformSource, Transformer,
    TransformerSettings,
};
use docweave::resource::ResourceLocator;
use docweave::traits::{ResolvedSource, UriResolver};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A temporary directory holding `files` (relative path, content).
pub fn resource_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

/// A locator over `roots` (directories or archives), in lookup order.
pub fn locator(roots: &[&Path]) -> Arc<ResourceLocator> {
    let mut locator = ResourceLocator::new();
    for root in roots {
        locator.add_path(root).unwrap();
    }
    Arc::new(locator)
}

/// Writes a zip archive with stored (uncompressed) entries.
pub fn write_stored_zip(path: &Path, files: &[(&str, &str)]) {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for (name, data) in files {
        let data = data.as_bytes();
        let offset = out.len() as u32;
        let crc = crc32fast::hash(data);
        let size = (data.len() as u32).to_le_bytes();

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size);
        out.extend_from_slice(&size);
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&size);
        central.extend_from_slice(&size);
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0; 12]);
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }
    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    fs::write(path, out).unwrap();
}

/// Counts compilations and remembers which URLs were compiled.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    count: AtomicUsize,
    compiled: Mutex<Vec<String>>,
}

impl CountingCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn compiled(&self) -> Vec<String> {
        self.compiled.lock().unwrap().clone()
    }
}

impl StylesheetCompiler for CountingCompiler {
    fn compile(
        &self,
        stylesheet: &ResolvedSource,
        _uri_resolver: Arc<dyn UriResolver>,
    ) -> Result<Arc<dyn CompiledStylesheet>, EngineError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let system_id = stylesheet.system_id.clone().unwrap_or_default();
        self.compiled.lock().unwrap().push(system_id.clone());
        if !stylesheet.text().contains("xsl:stylesheet") {
            return Err(EngineError::Compile {
                system_id,
                message: "document element is not xsl:stylesheet".to_string(),
            });
        }
        Ok(Arc::new(CompiledFake { system_id }))
    }
}

#[derive(Debug)]
struct CompiledFake {
    system_id: String,
}

impl CompiledStylesheet for CompiledFake {
    fn system_id(&self) -> Option<&str> {
        Some(&self.system_id)
    }

    fn new_transformer(&self) -> Result<Box<dyn Transformer>, EngineError> {
        Ok(Box::new(ParameterDump::default()))
    }
}

/// Writes `name=value` per parameter, then the source document.
#[derive(Debug, Default)]
struct ParameterDump {
    settings: TransformerSettings,
}

impl Transformer for ParameterDump {
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
        for (name, value) in &self.settings.parameters {
            writeln!(output, "{name}={value}")?;
        }
        output.write_all(&source.data)?;
        Ok(())
    }
}
