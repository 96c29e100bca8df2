//! OASIS XML catalog documents.

use super::{Catalog, CatalogEntry};
use docweave_resource::Uri;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("malformed catalog [{url}]: {message}")]
    Malformed { url: String, message: String },
}

/// Parses a catalog document. Relative URIs in entries are made absolute
/// against `url` and any `xml:base` in scope.
pub fn parse_catalog(data: &[u8], url: &str) -> Result<Catalog, CatalogError> {
    let malformed = |message: String| CatalogError::Malformed {
        url: url.to_string(),
        message,
    };

    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut catalog = Catalog::new(url);
    let mut bases = vec![url.to_string()];

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| malformed(e.to_string()))? {
            Event::Start(e) => {
                let attributes = read_attributes(&reader, &e).map_err(malformed)?;
                let base = scoped_base(current(&bases), &attributes);
                read_entry(&e, &attributes, &base, &mut catalog);
                bases.push(base);
            }
            Event::Empty(e) => {
                let attributes = read_attributes(&reader, &e).map_err(malformed)?;
                let base = scoped_base(current(&bases), &attributes);
                read_entry(&e, &attributes, &base, &mut catalog);
            }
            Event::End(_) => {
                bases.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(catalog)
}

fn current(bases: &[String]) -> &str {
    bases.last().map(String::as_str).unwrap_or_default()
}

fn scoped_base(parent: &str, attributes: &[(String, String)]) -> String {
    match attribute(attributes, "xml:base") {
        Some(base) => absolutize(parent, base),
        None => parent.to_string(),
    }
}

fn absolutize(base: &str, reference: &str) -> String {
    match (Uri::parse(base), Uri::parse(reference)) {
        (Ok(base), Ok(reference)) => base.resolve(&reference).to_string(),
        _ => reference.to_string(),
    }
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
}

fn read_attributes(reader: &Reader<&[u8]>, element: &BytesStart<'_>) -> Result<Vec<(String, String)>, String> {
    let mut attributes = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| e.to_string())?.to_string();
        let raw = reader.decoder().decode(attr.value.as_ref()).map_err(|e| e.to_string())?;
        let value = quick_xml::escape::unescape(&raw).map_err(|e| e.to_string())?.into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn read_entry(element: &BytesStart<'_>, attributes: &[(String, String)], base: &str, catalog: &mut Catalog) {
    let get = |name: &str| attribute(attributes, name);
    let target = |name: &str| get(name).map(|value| absolutize(base, value));

    let entry = match element.local_name().as_ref() {
        b"public" => get("publicId").zip(target("uri")).map(|(public_id, uri)| CatalogEntry::Public {
            public_id: normalize_public_id(public_id),
            uri,
        }),
        b"system" => get("systemId").zip(target("uri")).map(|(system_id, uri)| CatalogEntry::System {
            system_id: system_id.to_string(),
            uri,
        }),
        b"uri" => get("name").zip(target("uri")).map(|(name, uri)| CatalogEntry::Uri {
            name: name.to_string(),
            uri,
        }),
        b"rewriteSystem" => get("systemIdStartString")
            .zip(target("rewritePrefix"))
            .map(|(prefix, rewrite)| CatalogEntry::RewriteSystem {
                prefix: prefix.to_string(),
                rewrite,
            }),
        b"rewriteURI" => get("uriStartString")
            .zip(target("rewritePrefix"))
            .map(|(prefix, rewrite)| CatalogEntry::RewriteUri {
                prefix: prefix.to_string(),
                rewrite,
            }),
        b"systemSuffix" => get("systemIdSuffix").zip(target("uri")).map(|(suffix, uri)| CatalogEntry::SystemSuffix {
            suffix: suffix.to_string(),
            uri,
        }),
        b"uriSuffix" => get("uriSuffix").zip(target("uri")).map(|(suffix, uri)| CatalogEntry::UriSuffix {
            suffix: suffix.to_string(),
            uri,
        }),
        b"nextCatalog" => {
            if let Some(next) = target("catalog") {
                catalog.next_catalogs.push(next);
            }
            None
        }
        _ => None,
    };
    if let Some(entry) = entry {
        catalog.entries.push(entry);
    }
}

/// Collapses runs of whitespace, as public identifiers are compared.
pub(crate) fn normalize_public_id(public_id: &str) -> String {
    public_id.split_whitespace().collect::<Vec<_>>().join(" ")
}
