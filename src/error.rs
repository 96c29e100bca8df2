// src/error.rs
use docweave_engine::EngineError;
use docweave_traits::{ResolveError, ResourceError};
use std::path::PathBuf;
use thiserror::Error;

/// A comprehensive error type for the document build pipeline.
///
/// Declines never show up here; by the time a resolution problem becomes a
/// `DocweaveError` it is fatal for the current render.
#[derive(Error, Debug)]
pub enum DocweaveError {
    #[error("Unknown format name [{0}]")]
    UnknownFormat(String),

    #[error("Unable to build transformer from stylesheet [{url}]: {message}")]
    Stylesheet { url: String, message: String },

    #[error("Included file [{}] did not seem to be relative to basedir [{}]", .file.display(), .base.display())]
    AmbiguousBase { file: PathBuf, base: PathBuf },

    #[error("Unable to scan [{}] for inclusions: {message}", .file.display())]
    Inclusion { file: PathBuf, message: String },

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Transformation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DocweaveError {
    pub(crate) fn stylesheet(url: &str, cause: impl std::fmt::Display) -> Self {
        DocweaveError::Stylesheet {
            url: url.to_string(),
            message: cause.to_string(),
        }
    }
}
