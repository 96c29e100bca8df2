// src/inclusion.rs
//! Discovery of the files a master document pulls in through XInclude and
//! external entities.

use crate::error::DocweaveError;
use docweave_resource::{Uri, file_url_to_path};
use log::trace;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const XINCLUDE_NAMESPACE: &[u8] = b"http://www.w3.org/2001/XInclude";

/// Files directly referenced by `document`: `xi:include` hrefs and
/// `SYSTEM` entity declarations without a public identifier, resolved
/// against the document's directory. Remote references are ignored.
pub fn locate_inclusions(document: &Path) -> Result<BTreeSet<PathBuf>, DocweaveError> {
    let failed = |message: String| DocweaveError::Inclusion {
        file: document.to_path_buf(),
        message,
    };
    let data = fs::read(document)?;
    let directory = document.parent().unwrap_or_else(|| Path::new(""));

    let mut reader = NsReader::from_reader(data.as_slice());
    let mut buf = Vec::new();
    let mut includes = BTreeSet::new();

    loop {
        let (namespace, event) = reader.read_resolved_event_into(&mut buf).map_err(|e| failed(e.to_string()))?;
        let in_xinclude = matches!(namespace, ResolveResult::Bound(Namespace(ns)) if ns == XINCLUDE_NAMESPACE);
        match event {
            Event::Start(e) | Event::Empty(e) if in_xinclude && e.local_name().as_ref() == b"include" => {
                if let Some(href) = attribute_value(&e, "href").map_err(failed)? {
                    includes.extend(local_file(directory, &href));
                }
            }
            Event::DocType(doctype) => {
                let text = String::from_utf8_lossy(&doctype);
                for system_id in external_entity_system_ids(&text) {
                    includes.extend(local_file(directory, &system_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    trace!("{} references {} file(s)", document.display(), includes.len());
    Ok(includes)
}

/// Every file reachable from `master` through inclusions, recursively.
/// Only existing `*.xml` documents are followed.
pub fn find_all_inclusion_files(master: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), DocweaveError> {
    if !is_xml_file(master) {
        return Ok(());
    }
    for inclusion in locate_inclusions(master)? {
        if inclusion.exists() && files.insert(inclusion.clone()) {
            find_all_inclusion_files(&inclusion, files)?;
        }
    }
    Ok(())
}

/// Directory of `file` relative to `basedir`; `None` when `file` sits
/// directly in `basedir`.
pub fn determine_relativity(file: &Path, basedir: &Path) -> Result<Option<PathBuf>, DocweaveError> {
    let base = std::path::absolute(basedir)?;
    let absolute_file = std::path::absolute(file)?;
    let directory = absolute_file.parent().unwrap_or_else(|| Path::new(""));
    if directory == base {
        return Ok(None);
    }
    directory
        .strip_prefix(&base)
        .map(|relative| Some(relative.to_path_buf()))
        .map_err(|_| DocweaveError::AmbiguousBase {
            file: file.to_path_buf(),
            base: basedir.to_path_buf(),
        })
}

fn is_xml_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "xml")
}

fn attribute_value(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, String> {
    let Some(attr) = element.try_get_attribute(name).map_err(|e| e.to_string())? else {
        return Ok(None);
    };
    let raw = std::str::from_utf8(attr.value.as_ref()).map_err(|e| e.to_string())?;
    let value = quick_xml::escape::unescape(raw).map_err(|e| e.to_string())?;
    Ok(Some(value.into_owned()))
}

fn local_file(directory: &Path, reference: &str) -> Option<PathBuf> {
    let reference = reference.trim();
    let without_fragment = reference.split('#').next().unwrap_or_default();
    if without_fragment.is_empty() {
        return None;
    }
    match Uri::parse(without_fragment) {
        Ok(uri) if uri.scheme() == Some("file") => file_url_to_path(without_fragment),
        Ok(uri) if uri.is_absolute() => None,
        _ => Some(normalize(&directory.join(without_fragment))),
    }
}

/// Removes `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// System identifiers of `<!ENTITY name SYSTEM "...">` declarations.
fn external_entity_system_ids(doctype: &str) -> Vec<String> {
    doctype
        .split("<!ENTITY")
        .skip(1)
        .filter_map(|declaration| {
            let declaration = declaration.split('>').next().unwrap_or_default();
            let mut tokens = declaration.split_whitespace();
            let keyword = tokens.find(|token| *token == "SYSTEM" || *token == "PUBLIC")?;
            if keyword == "PUBLIC" {
                return None;
            }
            let rest = &declaration[declaration.find("SYSTEM")? + "SYSTEM".len()..];
            quoted_literal(rest.trim_start())
        })
        .collect()
}

fn quoted_literal(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &text[1..];
    body.find(quote).map(|end| body[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MASTER: &str = r#"<?xml version="1.0"?>
<!DOCTYPE book PUBLIC "-//OASIS//DTD DocBook XML V4.5//EN" "http://www.oasis-open.org/docbook/xml/4.5/docbookx.dtd" [
<!ENTITY % BOOK_ENTITIES SYSTEM "Guide.ent">
%BOOK_ENTITIES;
<!ENTITY legal PUBLIC "-//Example//Legal//EN" "legal.xml">
]>
<book xmlns:xi="http://www.w3.org/2001/XInclude">
  <xi:include href="Preface.xml"/>
  <xi:include href="chapters/Intro.xml#xpointer(/chapter)"/>
  <xi:include href="http://example.com/remote.xml"/>
  <include href="NotXInclude.xml"/>
</book>"#;

    #[test]
    fn test_locate_inclusions() {
        let dir = tempdir().unwrap();
        let master = dir.path().join("Guide.xml");
        fs::write(&master, MASTER).unwrap();

        let found = locate_inclusions(&master).unwrap();
        let expected: BTreeSet<PathBuf> = ["Guide.ent", "Preface.xml", "chapters/Intro.xml"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_find_all_inclusion_files_recurses() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("chapters")).unwrap();
        fs::write(root.join("Guide.xml"), MASTER).unwrap();
        fs::write(root.join("Guide.ent"), "<!ENTITY PRODUCT \"Docweave\">").unwrap();
        fs::write(
            root.join("Preface.xml"),
            r#"<preface xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="chapters/Feedback.xml"/></preface>"#,
        )
        .unwrap();
        fs::write(
            root.join("chapters/Intro.xml"),
            r#"<chapter xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="../Guide.xml"/></chapter>"#,
        )
        .unwrap();
        fs::write(root.join("chapters/Feedback.xml"), "<section/>").unwrap();

        let mut files = BTreeSet::new();
        find_all_inclusion_files(&root.join("Guide.xml"), &mut files).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["Guide.ent", "Guide.xml", "Preface.xml", "chapters/Feedback.xml", "chapters/Intro.xml"]);
    }

    #[test]
    fn test_non_xml_master_is_ignored() {
        let dir = tempdir().unwrap();
        let master = dir.path().join("Guide.ent");
        fs::write(&master, "<!ENTITY a SYSTEM \"b.xml\">").unwrap();
        let mut files = BTreeSet::new();
        find_all_inclusion_files(&master, &mut files).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_malformed_document_names_the_file() {
        let dir = tempdir().unwrap();
        let master = dir.path().join("Broken.xml");
        fs::write(&master, "<book><chapter></book>").unwrap();
        let err = locate_inclusions(&master).unwrap_err();
        assert!(matches!(&err, DocweaveError::Inclusion { file, .. } if file == &master));
    }

    #[test]
    fn test_determine_relativity() {
        let base = Path::new("/docs/en-US");
        assert_eq!(determine_relativity(Path::new("/docs/en-US/Guide.xml"), base).unwrap(), None);
        assert_eq!(
            determine_relativity(Path::new("/docs/en-US/chapters/part1/Intro.xml"), base).unwrap(),
            Some(PathBuf::from("chapters/part1"))
        );
        let err = determine_relativity(Path::new("/elsewhere/Intro.xml"), base).unwrap_err();
        assert!(matches!(err, DocweaveError::AmbiguousBase { .. }));
        assert!(err.to_string().contains("did not seem to be relative to basedir"));
    }

    #[test]
    fn test_external_entity_system_ids() {
        let ids = external_entity_system_ids(
            "book [ <!ENTITY a SYSTEM 'a.xml'> <!ENTITY b PUBLIC \"-//B//EN\" \"b.xml\"> <!ENTITY % c SYSTEM \"c.ent\"> ]",
        );
        assert_eq!(ids, vec!["a.xml".to_string(), "c.ent".to_string()]);
    }
}
