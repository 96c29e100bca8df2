//! Zip/jar archive roots of the resource space.
//!
//! Stylesheet distributions are commonly shipped as archives. The whole
//! archive is read once and its central directory indexed; entries are
//! inflated on demand. Only stored and deflated entries are supported, and
//! zip64 archives are rejected.

use crate::uri::{file_url, remove_dot_segments};
use docweave_traits::{ResourceError, ResourceProvider, SharedResourceData, normalize_entry_name};
use log::trace;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
const END_OF_CENTRAL_DIRECTORY_LEN: usize = 22;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

#[derive(Debug, Clone, Copy)]
struct ZipEntry {
    method: u16,
    crc32: u32,
    compressed_size: usize,
    uncompressed_size: usize,
    local_header_offset: usize,
}

/// A resource root backed by a zip or jar archive.
pub struct ArchiveResourceProvider {
    archive_path: PathBuf,
    archive_url: String,
    bytes: Vec<u8>,
    entries: HashMap<String, ZipEntry>,
}

impl std::fmt::Debug for ArchiveResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveResourceProvider")
            .field("archive_path", &self.archive_path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ArchiveResourceProvider {
    /// Reads and indexes the archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ResourceError> {
        let archive_path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&archive_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(archive_path.display().to_string())
            } else {
                ResourceError::LoadFailed {
                    path: archive_path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        let absolute = archive_path.canonicalize().unwrap_or_else(|_| archive_path.clone());
        Self::from_bytes(file_url(&absolute), archive_path, bytes)
    }

    fn from_bytes(archive_url: String, archive_path: PathBuf, bytes: Vec<u8>) -> Result<Self, ResourceError> {
        let label = archive_path.display().to_string();
        let entries = read_central_directory(&bytes).map_err(|message| ResourceError::LoadFailed {
            path: label.clone(),
            message,
        })?;
        trace!("indexed {} entries in archive {}", entries.len(), label);
        Ok(Self {
            archive_path,
            archive_url,
            bytes,
            entries,
        })
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Names of all file entries, unordered.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn entry_key(path: &str) -> String {
        remove_dot_segments(normalize_entry_name(path))
    }

    fn read_entry(&self, name: &str, entry: &ZipEntry) -> Result<Vec<u8>, String> {
        let header = self
            .bytes
            .get(entry.local_header_offset..entry.local_header_offset + 30)
            .ok_or("local header out of bounds")?;
        if read_u32(header, 0) != LOCAL_HEADER_SIGNATURE {
            return Err("bad local header signature".to_string());
        }
        let name_len = usize::from(read_u16(header, 26));
        let extra_len = usize::from(read_u16(header, 28));
        let start = entry.local_header_offset + 30 + name_len + extra_len;
        let raw = self
            .bytes
            .get(start..start + entry.compressed_size)
            .ok_or("entry data out of bounds")?;

        let data = match entry.method {
            METHOD_STORED => raw.to_vec(),
            METHOD_DEFLATED => miniz_oxide::inflate::decompress_to_vec(raw)
                .map_err(|e| format!("inflate failed for {name}: {e:?}"))?,
            other => return Err(format!("unsupported compression method {other} for {name}")),
        };
        if data.len() != entry.uncompressed_size {
            return Err(format!("size mismatch for {name}"));
        }
        if crc32fast::hash(&data) != entry.crc32 {
            return Err(format!("crc mismatch for {name}"));
        }
        Ok(data)
    }
}

impl ResourceProvider for ArchiveResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let key = Self::entry_key(path);
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))?;
        self.read_entry(&key, entry)
            .map(Arc::new)
            .map_err(|message| ResourceError::LoadFailed {
                path: self.url_for(path),
                message,
            })
    }

    fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(&Self::entry_key(path))
    }

    fn url_for(&self, path: &str) -> String {
        format!("jar:{}!/{}", self.archive_url, normalize_entry_name(path))
    }

    fn name(&self) -> &'static str {
        "ArchiveResourceProvider"
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn find_end_of_central_directory(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < END_OF_CENTRAL_DIRECTORY_LEN {
        return None;
    }
    let lowest = bytes.len().saturating_sub(END_OF_CENTRAL_DIRECTORY_LEN + MAX_COMMENT_LEN);
    (lowest..=bytes.len() - END_OF_CENTRAL_DIRECTORY_LEN)
        .rev()
        .find(|&at| read_u32(bytes, at) == END_OF_CENTRAL_DIRECTORY_SIGNATURE)
}

fn read_central_directory(bytes: &[u8]) -> Result<HashMap<String, ZipEntry>, String> {
    let eocd = find_end_of_central_directory(bytes).ok_or("not a zip archive")?;
    let total_entries = usize::from(read_u16(bytes, eocd + 10));
    let directory_offset = read_u32(bytes, eocd + 16);
    if directory_offset == u32::MAX {
        return Err("zip64 archives are not supported".to_string());
    }

    let mut entries = HashMap::with_capacity(total_entries);
    let mut at = directory_offset as usize;
    for _ in 0..total_entries {
        let header = bytes.get(at..at + 46).ok_or("central directory out of bounds")?;
        if read_u32(header, 0) != CENTRAL_HEADER_SIGNATURE {
            return Err("bad central directory signature".to_string());
        }
        let name_len = usize::from(read_u16(header, 28));
        let extra_len = usize::from(read_u16(header, 30));
        let comment_len = usize::from(read_u16(header, 32));
        let name_bytes = bytes
            .get(at + 46..at + 46 + name_len)
            .ok_or("entry name out of bounds")?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        if !name.ends_with('/') {
            entries.insert(
                remove_dot_segments(normalize_entry_name(&name)),
                ZipEntry {
                    method: read_u16(header, 10),
                    crc32: read_u32(header, 16),
                    compressed_size: read_u32(header, 20) as usize,
                    uncompressed_size: read_u32(header, 24) as usize,
                    local_header_offset: read_u32(header, 42) as usize,
                },
            );
        }
        at += 46 + name_len + extra_len + comment_len;
    }
    Ok(entries)
}
