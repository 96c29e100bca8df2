use super::metadata::FormatMetadata;
use crate::error::DocweaveError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User-declared options for one output format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub name: String,
    /// Overrides the derived output file name.
    #[serde(default)]
    pub target_final_name: Option<String>,
    /// Overrides the format's default stylesheet.
    #[serde(default)]
    pub stylesheet_resource: Option<String>,
}

impl FormatOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_target_final_name(mut self, name: impl Into<String>) -> Self {
        self.target_final_name = Some(name.into());
        self
    }

    pub fn with_stylesheet_resource(mut self, resource: impl Into<String>) -> Self {
        self.stylesheet_resource = Some(resource.into());
        self
    }
}

/// How one format is produced for one render. Built per render and never
/// shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    metadata: &'static FormatMetadata,
    options: FormatOptions,
}

impl FormatPlan {
    pub fn name(&self) -> &str {
        self.metadata.name
    }

    pub fn metadata(&self) -> &'static FormatMetadata {
        self.metadata
    }

    /// The user's stylesheet if one was given, the format's default otherwise.
    pub fn stylesheet_resource(&self) -> &str {
        self.options
            .stylesheet_resource
            .as_deref()
            .unwrap_or(self.metadata.stylesheet_resource)
    }

    /// The format's default stylesheet, regardless of any override.
    pub fn corresponding_docbook_stylesheet_resource(&self) -> &str {
        self.metadata.stylesheet_resource
    }

    /// Output file name for `source`: the user's name if one was given,
    /// otherwise the source's file stem plus the format's extension.
    pub fn target_file_name(&self, source: &Path) -> String {
        if let Some(name) = &self.options.target_final_name {
            return name.clone();
        }
        let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        format!("{}.{}", stem, self.metadata.file_extension)
    }

    pub fn requires_image_path(&self) -> bool {
        self.metadata.requires_image_path
    }

    pub fn requires_image_copying(&self) -> bool {
        self.metadata.requires_image_copying
    }

    pub fn does_chunking(&self) -> bool {
        self.metadata.does_chunking
    }

    pub fn is_paginated(&self) -> bool {
        self.metadata.is_paginated()
    }
}

/// Merges [`FormatOptions`] with the matching [`FormatMetadata`].
pub struct FormatPlanBuilder;

impl FormatPlanBuilder {
    /// Fails with [`DocweaveError::UnknownFormat`] when no format of that
    /// name is registered.
    pub fn build(options: &FormatOptions) -> Result<FormatPlan, DocweaveError> {
        let metadata =
            FormatMetadata::lookup(&options.name).ok_or_else(|| DocweaveError::UnknownFormat(options.name.clone()))?;
        Ok(FormatPlan {
            metadata,
            options: options.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_plan_defaults() {
        let plan = FormatPlanBuilder::build(&FormatOptions::new("html")).unwrap();
        assert_eq!(plan.name(), "html");
        assert_eq!(plan.target_file_name(Path::new("/docs/en-US/guide.xml")), "guide.html");
        assert!(plan.does_chunking());
        assert!(plan.requires_image_copying());
        assert!(!plan.requires_image_path());
        assert_eq!(plan.stylesheet_resource(), "/html/chunk.xsl");
    }

    #[test]
    fn test_overrides() {
        let options = FormatOptions::new("pdf")
            .with_target_final_name("Admin_Guide.pdf")
            .with_stylesheet_resource("classpath:/xslt/custom/pdf.xsl");
        let plan = FormatPlanBuilder::build(&options).unwrap();
        assert_eq!(plan.target_file_name(Path::new("guide.xml")), "Admin_Guide.pdf");
        assert_eq!(plan.stylesheet_resource(), "classpath:/xslt/custom/pdf.xsl");
        assert_eq!(plan.corresponding_docbook_stylesheet_resource(), "/fo/docbook.xsl");
        assert!(plan.requires_image_path());
        assert!(plan.is_paginated());
    }

    #[test]
    fn test_unknown_format_names_the_format() {
        let err = FormatPlanBuilder::build(&FormatOptions::new("nonexistent-format")).unwrap_err();
        assert!(matches!(&err, DocweaveError::UnknownFormat(name) if name == "nonexistent-format"));
        assert!(err.to_string().contains("nonexistent-format"));
    }

    #[test]
    fn test_options_from_json() {
        let options: FormatOptions = serde_json::from_str(r#"{ "name": "html_single", "targetFinalName": "index.html" }"#).unwrap();
        assert_eq!(options.target_final_name.as_deref(), Some("index.html"));
        assert!(options.stylesheet_resource.is_none());
    }
}
