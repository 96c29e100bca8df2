//! Shared contracts for the docweave pipeline.
//!
//! Everything that crosses a crate boundary lives here: the resource
//! provider contract used by the locator, and the two resolution protocols
//! (entity resolution and reference resolution) implemented by resolvers.

pub mod resolve;
pub mod resource;

pub use resolve::{EntityRequest, EntityResolver, Resolution, ResolveError, ResolvedSource, UriResolver};
pub use resource::{
    InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData, normalize_entry_name,
};
