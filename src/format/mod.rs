//! Output formats.
//!
//! Every supported format has a static [`FormatMetadata`] record. A render
//! combines it with the user's [`FormatOptions`] into an immutable
//! [`FormatPlan`] through [`FormatPlanBuilder`].

mod metadata;
mod plan;

pub use metadata::{
    ECLIPSE, FormatMetadata, HTML, HTML_SINGLE, HTMLHELP, JAVAHELP, MAN, PDF, STANDARD_FORMATS, WEBSITE, XHTML,
};
pub use plan::{FormatOptions, FormatPlan, FormatPlanBuilder};
