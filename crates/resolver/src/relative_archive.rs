use docweave_resource::{Uri, open_url};
use docweave_traits::{Resolution, ResolveError, ResolvedSource, UriResolver};
use log::trace;

/// Resolves relative references made from inside an archive.
///
/// Applies only when `href` is relative and `base` is a `jar:` URL. Two
/// absolute forms are tried in turn: the archive URL itself
/// (`jar:file:///a.jar!/dir/{href}`) and the same with the outer `jar:`
/// token removed (`file:///a.jar!/dir/{href}`). Packagings disagree about
/// which form opens, so neither is treated as authoritative: failures of
/// either are swallowed and the resolver declines when both fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeArchiveResolver;

impl RelativeArchiveResolver {
    pub fn new() -> Self {
        Self
    }

    /// The candidate URLs, in the order they are tried.
    pub fn candidates(href: &str, base: &str) -> Option<[String; 2]> {
        let relative = Uri::parse(href).is_ok_and(|uri| !uri.is_absolute()) && !href.starts_with('/');
        if !relative || !base.starts_with("jar:") {
            return None;
        }
        let directory = &base[..base.rfind('/').map_or(0, |i| i + 1)];
        let nested = format!("{directory}{href}");
        let plain = format!("{}{href}", directory.strip_prefix("jar:").unwrap_or(directory));
        Some([nested, plain])
    }
}

impl UriResolver for RelativeArchiveResolver {
    fn resolve_uri(&self, href: &str, base: &str) -> Result<Resolution, ResolveError> {
        let Some(candidates) = Self::candidates(href, base) else {
            return Ok(Resolution::Declined);
        };
        for candidate in candidates {
            match open_url(&candidate) {
                Ok(data) => return Ok(Resolution::Resolved(ResolvedSource::new(candidate, data))),
                Err(e) => trace!("archive-relative candidate [{candidate}] failed: {e}"),
            }
        }
        Ok(Resolution::Declined)
    }
}
