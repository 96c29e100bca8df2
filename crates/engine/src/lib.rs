//! Core abstractions for stylesheet transformation
//!
//! This crate defines the contract between the docweave pipeline and a
//! stylesheet transformation engine. The pipeline never parses or
//! serializes documents itself; it resolves stylesheets, hands them to a
//! [`StylesheetCompiler`], and drives the resulting [`Transformer`]s.
//!
//! ## Key Abstractions
//!
//! - **`StylesheetCompiler`**: compiles a resolved stylesheet into a reusable artifact
//! - **`CompiledStylesheet`**: the reusable, thread-safe compiled artifact
//! - **`Transformer`**: a single-use, configurable transformation instance
//! - **`MessageSink`**: receives the engine's diagnostic messages

use docweave_traits::{EntityResolver, ResolvedSource, SharedResourceData, UriResolver};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by a transformation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Stylesheet compilation failed for [{system_id}]: {message}")]
    Compile { system_id: String, message: String },

    #[error("Transformation failed: {0}")]
    Transform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transformation parameters, by name.
pub type Parameters = BTreeMap<String, String>;

/// Receives the engine's diagnostic output (`xsl:message` and friends).
pub trait MessageSink: Send + Sync + fmt::Debug {
    fn message(&self, text: &str);
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn message(&self, _text: &str) {}
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct BufferedSink {
    messages: Mutex<Vec<String>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an empty list if the lock is poisoned.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl MessageSink for BufferedSink {
    fn message(&self, text: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
    }
}

/// The document a transformer is run against.
#[derive(Clone)]
pub struct TransformSource {
    pub system_id: Option<String>,
    pub data: SharedResourceData,
    /// Resolver for the document's own external entities.
    pub entity_resolver: Option<Arc<dyn EntityResolver>>,
}

impl TransformSource {
    pub fn new(system_id: Option<String>, data: SharedResourceData) -> Self {
        Self {
            system_id,
            data,
            entity_resolver: None,
        }
    }

    pub fn from_path(path: &Path, system_id: impl Into<String>) -> Result<Self, EngineError> {
        let data = std::fs::read(path)?;
        Ok(Self::new(Some(system_id.into()), Arc::new(data)))
    }

    pub fn with_entity_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.entity_resolver = Some(resolver);
        self
    }
}

impl From<ResolvedSource> for TransformSource {
    fn from(source: ResolvedSource) -> Self {
        Self::new(source.system_id, source.data)
    }
}

impl fmt::Debug for TransformSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSource")
            .field("system_id", &self.system_id)
            .field("len", &self.data.len())
            .field("entity_resolver", &self.entity_resolver.is_some())
            .finish()
    }
}

/// Compiles stylesheets.
pub trait StylesheetCompiler: Send + Sync + fmt::Debug {
    /// Compiles `stylesheet`. Imports and includes inside it are resolved
    /// through `uri_resolver`.
    fn compile(
        &self,
        stylesheet: &ResolvedSource,
        uri_resolver: Arc<dyn UriResolver>,
    ) -> Result<Arc<dyn CompiledStylesheet>, EngineError>;
}

/// A reusable, thread-safe compiled stylesheet.
pub trait CompiledStylesheet: Send + Sync + fmt::Debug {
    fn system_id(&self) -> Option<&str>;

    /// Creates a fresh transformer with no parameters set.
    fn new_transformer(&self) -> Result<Box<dyn Transformer>, EngineError>;
}

/// A single transformation instance.
pub trait Transformer: Send + fmt::Debug {
    fn set_parameter(&mut self, name: &str, value: &str);

    fn parameter(&self, name: &str) -> Option<&str>;

    fn parameters(&self) -> &Parameters;

    /// Resolver for `document()`, `xsl:import` and `xsl:include` references
    /// made while transforming.
    fn set_uri_resolver(&mut self, resolver: Arc<dyn UriResolver>);

    fn uri_resolver(&self) -> Option<Arc<dyn UriResolver>>;

    fn set_message_sink(&mut self, sink: Arc<dyn MessageSink>);

    fn transform(&mut self, source: &TransformSource, output: &mut dyn Write) -> Result<(), EngineError>;
}

/// Bookkeeping shared by transformer implementations: parameters, the
/// attached resolver and the message sink.
#[derive(Debug, Clone, Default)]
pub struct TransformerSettings {
    pub parameters: Parameters,
    pub uri_resolver: Option<Arc<dyn UriResolver>>,
    pub message_sink: Option<Arc<dyn MessageSink>>,
}

impl TransformerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parameter(&mut self, name: &str, value: &str) {
        self.parameters.insert(name.to_string(), value.to_string());
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Sends `text` to the sink, if one is attached.
    pub fn emit(&self, text: &str) {
        if let Some(sink) = &self.message_sink {
            sink.message(text);
        }
    }
}
