/// Static description of one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMetadata {
    pub name: &'static str,
    /// Default stylesheet, as a resource name.
    pub stylesheet_resource: &'static str,
    /// Extension of the main output file, without the dot.
    pub file_extension: &'static str,
    /// Whether the `img.src.path` parameter must point at the staged images.
    pub requires_image_path: bool,
    /// Whether staged images and css are copied next to the output.
    pub requires_image_copying: bool,
    pub does_chunking: bool,
}

impl FormatMetadata {
    const fn html_based(name: &'static str, stylesheet_resource: &'static str, does_chunking: bool) -> Self {
        Self {
            name,
            stylesheet_resource,
            file_extension: "html",
            requires_image_path: false,
            requires_image_copying: true,
            does_chunking,
        }
    }

    /// Looks a standard format up by name. Names are case-sensitive.
    pub fn lookup(name: &str) -> Option<&'static FormatMetadata> {
        STANDARD_FORMATS.iter().find(|format| format.name == name)
    }

    /// True for formats whose transformation output is XSL-FO that still
    /// has to be paginated.
    pub fn is_paginated(&self) -> bool {
        self.name == PDF.name
    }
}

pub const PDF: FormatMetadata = FormatMetadata {
    name: "pdf",
    stylesheet_resource: "/fo/docbook.xsl",
    file_extension: "pdf",
    requires_image_path: true,
    requires_image_copying: false,
    does_chunking: false,
};

pub const XHTML: FormatMetadata = FormatMetadata {
    name: "xhtml",
    stylesheet_resource: "/xhtml/docbook.xsl",
    file_extension: "xhtml",
    requires_image_path: false,
    requires_image_copying: true,
    does_chunking: false,
};

pub const ECLIPSE: FormatMetadata = FormatMetadata::html_based("eclipse", "/eclipse/eclipse.xsl", true);
pub const HTML: FormatMetadata = FormatMetadata::html_based("html", "/html/chunk.xsl", true);
pub const HTML_SINGLE: FormatMetadata = FormatMetadata::html_based("html_single", "/html/docbook.xsl", false);
pub const HTMLHELP: FormatMetadata = FormatMetadata::html_based("htmlhelp", "/htmlhelp/htmlhelp.xsl", true);
pub const JAVAHELP: FormatMetadata = FormatMetadata::html_based("javahelp", "/javahelp/javahelp.xsl", true);
pub const MAN: FormatMetadata = FormatMetadata::html_based("man", "/manpages/docbook.xsl", false);
pub const WEBSITE: FormatMetadata = FormatMetadata::html_based("website", "/website/website.xsl", false);

pub const STANDARD_FORMATS: [FormatMetadata; 9] = [PDF, XHTML, ECLIPSE, HTML, HTML_SINGLE, HTMLHELP, JAVAHELP, MAN, WEBSITE];
