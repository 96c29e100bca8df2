//! URI references (RFC 3986) and `file:` URL conversion.
//!
//! Only what resolution needs: splitting a reference into its components,
//! resolving a relative reference against a base, and removing dot
//! segments. Archive URLs such as `jar:file:///a.jar!/html/chunk.xsl` parse
//! with everything after the scheme as their path, which is what makes
//! relative resolution against them work.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("illegal character in URI [{0}]")]
    IllegalCharacter(String),

    #[error("illegal scheme in URI [{0}]")]
    IllegalScheme(String),
}

/// A parsed URI reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Uri {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if input.chars().any(is_illegal) {
            return Err(UriError::IllegalCharacter(input.to_string()));
        }

        let mut rest = input;
        let mut scheme = None;
        let first_delimiter = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        if let Some(colon) = rest[..first_delimiter].find(':') {
            let candidate = &rest[..colon];
            if !is_valid_scheme(candidate) {
                return Err(UriError::IllegalScheme(input.to_string()));
            }
            scheme = Some(candidate.to_ascii_lowercase());
            rest = &rest[colon + 1..];
        }

        let mut fragment = None;
        if let Some(hash) = rest.find('#') {
            fragment = Some(rest[hash + 1..].to_string());
            rest = &rest[..hash];
        }

        let mut query = None;
        if let Some(question) = rest.find('?') {
            query = Some(rest[question + 1..].to_string());
            rest = &rest[..question];
        }

        let mut authority = None;
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find('/').unwrap_or(after.len());
            authority = Some(after[..end].to_string());
            rest = &after[end..];
        }

        Ok(Self {
            scheme,
            authority,
            path: rest.to_string(),
            query,
            fragment,
        })
    }

    /// An empty `file` URI with an empty authority, i.e. `file://`.
    ///
    /// Used as the base when a base URI is absent or unparsable.
    pub fn empty_file() -> Self {
        Self {
            scheme: Some("file".to_string()),
            authority: Some(String::new()),
            ..Self::default()
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Resolves `reference` against `self` (RFC 3986 §5.2.2).
    pub fn resolve(&self, reference: &Uri) -> Uri {
        let mut target = Uri {
            fragment: reference.fragment.clone(),
            ..Uri::default()
        };

        if reference.scheme.is_some() {
            target.scheme = reference.scheme.clone();
            target.authority = reference.authority.clone();
            target.path = remove_dot_segments(&reference.path);
            target.query = reference.query.clone();
            return target;
        }

        target.scheme = self.scheme.clone();
        if reference.authority.is_some() {
            target.authority = reference.authority.clone();
            target.path = remove_dot_segments(&reference.path);
            target.query = reference.query.clone();
            return target;
        }

        target.authority = self.authority.clone();
        if reference.path.is_empty() {
            target.path = self.path.clone();
            target.query = reference.query.clone().or_else(|| self.query.clone());
        } else {
            target.path = if reference.path.starts_with('/') {
                remove_dot_segments(&reference.path)
            } else {
                remove_dot_segments(&self.merge(&reference.path))
            };
            target.query = reference.query.clone();
        }
        target
    }

    /// Parses `reference` and resolves it against `self`.
    pub fn resolve_str(&self, reference: &str) -> Result<Uri, UriError> {
        Ok(self.resolve(&Uri::parse(reference)?))
    }

    /// Same URI with dot segments removed from its path.
    pub fn normalize(mut self) -> Uri {
        self.path = remove_dot_segments(&self.path);
        self
    }

    fn merge(&self, reference_path: &str) -> String {
        if self.authority.is_some() && self.path.is_empty() {
            return format!("/{reference_path}");
        }
        match self.path.rfind('/') {
            Some(index) => format!("{}{}", &self.path[..=index], reference_path),
            None => reference_path.to_string(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn is_valid_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Removes `.` and `..` segments from a path (RFC 3986 §5.2.4).
pub fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_last_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_last_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

fn pop_last_segment(output: &mut String) {
    match output.rfind('/') {
        Some(index) => output.truncate(index),
        None => output.clear(),
    }
}

/// `file:` URL for a local path, absolutised against the working directory.
pub fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let mut text = absolute.to_string_lossy().replace('\\', "/");
    if !text.starts_with('/') {
        text.insert(0, '/');
    }
    format!("file://{}", percent_encode_path(&text))
}

/// Local path named by a `file:` URL; `None` for any other scheme or a
/// remote authority.
pub fn file_url_to_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file:")?;
    let path = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find('/').unwrap_or(after.len());
            let authority = &after[..end];
            if !authority.is_empty() && !authority.eq_ignore_ascii_case("localhost") {
                return None;
            }
            &after[end..]
        }
        None => rest,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(percent_decode(path)))
}

/// Percent-encodes every character [`Uri::parse`] rejects, as UTF-8
/// octets. Everything else is left alone, including existing escapes.
pub fn escape_illegal(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if is_illegal(c) {
            let mut octets = [0; 4];
            for byte in c.encode_utf8(&mut octets).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn is_illegal(c: char) -> bool {
    c.is_whitespace() || c.is_control() || matches!(c, '"' | '<' | '>' | '\\' | '{' | '}' | '|' | '^' | '`')
}

fn percent_encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => encoded.push_str("%20"),
            '%' => encoded.push_str("%25"),
            '#' => encoded.push_str("%23"),
            '?' => encoded.push_str("%3F"),
            _ => encoded.push(c),
        }
    }
    encoded
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            decoded.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
