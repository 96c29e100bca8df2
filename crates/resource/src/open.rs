//! Opening local URLs.
//!
//! Two schemes are understood: `file:` and `jar:<archive url>!/<entry>`.
//! Everything else is refused with [`ResourceError::Unsupported`]; nothing
//! in this crate ever reaches for the network.

use crate::archive::ArchiveResourceProvider;
use crate::uri::file_url_to_path;
use docweave_traits::{ResourceError, ResourceProvider, SharedResourceData};
use log::trace;
use std::sync::Arc;

/// Reads the content named by a local URL.
pub fn open_url(url: &str) -> Result<SharedResourceData, ResourceError> {
    trace!("opening [{url}]");
    if let Some(archive_url) = url.strip_prefix("jar:") {
        let (outer, entry) = archive_url
            .split_once("!/")
            .ok_or_else(|| ResourceError::Malformed(url.to_string()))?;
        let archive_path = file_url_to_path(outer).ok_or_else(|| ResourceError::Unsupported(url.to_string()))?;
        let archive = ArchiveResourceProvider::open(archive_path)?;
        return archive.load(entry).map_err(|e| match e {
            ResourceError::NotFound(_) => ResourceError::NotFound(url.to_string()),
            other => other,
        });
    }

    if url.starts_with("file:") {
        let path = file_url_to_path(url).ok_or_else(|| ResourceError::Malformed(url.to_string()))?;
        return std::fs::read(&path).map(Arc::new).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound(url.to_string()),
            // "x.jar!/entry" style paths fail this way on most platforms
            std::io::ErrorKind::NotADirectory => ResourceError::NotFound(url.to_string()),
            _ => ResourceError::LoadFailed {
                path: url.to_string(),
                message: e.to_string(),
            },
        });
    }

    Err(ResourceError::Unsupported(url.to_string()))
}
