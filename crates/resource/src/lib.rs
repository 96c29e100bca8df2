//! Resource lookup for the docweave pipeline.
//!
//! The loadable resource space is an ordered list of roots, consulted the
//! way a class loader walks its classpath:
//!
//! - [`FilesystemResourceProvider`]: a directory
//! - [`ArchiveResourceProvider`]: a zip/jar archive
//! - [`InMemoryResourceProvider`]: pre-populated memory (re-exported)
//!
//! [`ResourceLocator`] implements the `classpath:` / `file:` naming rules on
//! top of those roots, [`open_url`] opens the local URLs they hand out, and
//! [`Uri`] provides the RFC 3986 reference resolution used when expanding
//! relative identifiers.

mod archive;
mod filesystem;
mod locator;
mod open;
pub mod uri;

pub use archive::ArchiveResourceProvider;
pub use filesystem::FilesystemResourceProvider;
pub use locator::{ResourceLocation, ResourceLocator, CLASSPATH_SCHEME, FILE_SCHEME};
pub use open::open_url;
pub use uri::{Uri, UriError, escape_illegal, file_url, file_url_to_path, remove_dot_segments};

pub use docweave_traits::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData};
