// src/source.rs
//! Document sources handed to transformers.

use crate::error::DocweaveError;
use docweave_engine::TransformSource;
use docweave_resolver::{ValueInjection, injected_entity_subset};
use docweave_resource::file_url;
use docweave_traits::EntityResolver;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Reads `file` into a source whose entities resolve through
/// `entity_resolver`, with `injections` declared in its internal subset.
pub fn build_document_source(
    file: &Path,
    entity_resolver: Arc<dyn EntityResolver>,
    injections: &[ValueInjection],
) -> Result<TransformSource, DocweaveError> {
    let data = fs::read(file)?;
    let data = if injections.is_empty() {
        data
    } else {
        inject_internal_subset(&data, injections)
    };
    let absolute = std::path::absolute(file)?;
    Ok(TransformSource::new(Some(file_url(&absolute)), Arc::new(data)).with_entity_resolver(entity_resolver))
}

/// Prepends the injected declarations to the document's internal subset,
/// adding one when the DOCTYPE has none.
///
/// Documents without a DOCTYPE come back unchanged; they receive the
/// declarations as an external subset from the entity chain instead.
pub fn inject_internal_subset(document: &[u8], injections: &[ValueInjection]) -> Vec<u8> {
    let Some((start, end)) = find_doctype(document) else {
        return document.to_vec();
    };
    let declarations = injected_entity_subset(injections);
    let doctype = &document[start..end];

    let mut out = Vec::with_capacity(document.len() + declarations.len() + 4);
    out.extend_from_slice(&document[..start]);
    match internal_subset_open(doctype) {
        Some(open) => {
            out.extend_from_slice(&doctype[..=open]);
            out.push(b'\n');
            out.extend_from_slice(declarations.as_bytes());
            out.extend_from_slice(&doctype[open + 1..]);
        }
        None => {
            let close = doctype.len().saturating_sub(1);
            out.extend_from_slice(&doctype[..close]);
            out.extend_from_slice(b" [\n");
            out.extend_from_slice(declarations.as_bytes());
            out.push(b']');
            out.extend_from_slice(&doctype[close..]);
        }
    }
    out.extend_from_slice(&document[end..]);
    out
}

/// Byte range of the `<!DOCTYPE ...>` declaration, if it precedes the root
/// element.
fn find_doctype(document: &[u8]) -> Option<(usize, usize)> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();
    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf) {
            Ok(Event::DocType(_)) => return Some((start, reader.buffer_position() as usize)),
            Ok(Event::Start(_) | Event::Empty(_) | Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Index of the `[` opening the internal subset, skipping quoted literals.
fn internal_subset_open(doctype: &[u8]) -> Option<usize> {
    let mut quote = None;
    for (i, &byte) in doctype.iter().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(q), _) if q == byte => quote = None,
            (None, b'[') => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_resolver::XIncludeEntityResolver;
    use tempfile::tempdir;

    fn injections() -> Vec<ValueInjection> {
        vec![ValueInjection::new("product", "Docweave")]
    }

    fn inject(document: &str) -> String {
        String::from_utf8(inject_internal_subset(document.as_bytes(), &injections())).unwrap()
    }

    #[test]
    fn test_existing_internal_subset_is_extended() {
        let document = "<?xml version=\"1.0\"?>\n<!DOCTYPE book PUBLIC \"-//OASIS//DTD DocBook XML V4.5//EN\" \"docbookx.dtd\" [\n<!ENTITY holder \"Someone\">\n]>\n<book/>";
        assert_eq!(
            inject(document),
            "<?xml version=\"1.0\"?>\n<!DOCTYPE book PUBLIC \"-//OASIS//DTD DocBook XML V4.5//EN\" \"docbookx.dtd\" [\n<!ENTITY product \"Docweave\">\n\n<!ENTITY holder \"Someone\">\n]>\n<book/>"
        );
    }

    #[test]
    fn test_internal_subset_is_created() {
        let document = "<!DOCTYPE book SYSTEM \"odd[name].dtd\">\n<book>&product;</book>";
        assert_eq!(
            inject(document),
            "<!DOCTYPE book SYSTEM \"odd[name].dtd\" [\n<!ENTITY product \"Docweave\">\n]>\n<book>&product;</book>"
        );
    }

    #[test]
    fn test_document_without_doctype_is_unchanged() {
        let document = "<?xml version=\"1.0\"?>\n<book><!-- <!DOCTYPE x> --></book>";
        assert_eq!(inject(document), document);
    }

    #[test]
    fn test_build_document_source() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("book.xml");
        fs::write(&file, "<!DOCTYPE book>\n<book/>").unwrap();

        let resolver: Arc<dyn EntityResolver> = Arc::new(XIncludeEntityResolver::new(injections()));
        let source = build_document_source(&file, resolver, &injections()).unwrap();
        assert!(source.system_id.as_deref().unwrap().starts_with("file:"));
        assert!(source.system_id.as_deref().unwrap().ends_with("/book.xml"));
        assert!(source.entity_resolver.is_some());
        assert!(String::from_utf8_lossy(&source.data).contains("<!ENTITY product \"Docweave\">"));
    }

    #[test]
    fn test_missing_document_is_an_io_error() {
        let resolver: Arc<dyn EntityResolver> = Arc::new(XIncludeEntityResolver::default());
        let err = build_document_source(Path::new("/no/such/book.xml"), resolver, &[]).unwrap_err();
        assert!(matches!(err, DocweaveError::Io(_)));
    }
}
