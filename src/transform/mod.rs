//! Transformer construction.
//!
//! [`TransformerBuilder`] resolves a stylesheet, compiles it through the
//! [`TemplateCache`], and configures the transformer with the reference
//! chain, a silent message sink and the build's parameters.

mod builder;
mod cache;

pub use builder::{FIXED_PARAMETERS, TransformerBuilder};
pub use cache::TemplateCache;
