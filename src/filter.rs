use crate::error::{Result, ScrapeError};
use std::collections::HashSet;
use url::{Position, Url};

/// Prefix sandbox that keeps a crawl inside one walkthrough.
///
/// The prefix is `scheme://host[:port]/<first path segment>/`, derived once
/// from the start URL. Walkthrough pages live at `/<game-slug>/<page>`, so
/// every page of the same guide shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSandbox {
    prefix: String,
}

impl UrlSandbox {
    /// Derive the sandbox from the start URL
    pub fn from_start_url(start: &Url) -> Self {
        let origin = &start[..Position::BeforePath];
        let slug = start
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()));

        let prefix = match slug {
            Some(slug) => format!("{}/{}/", origin, slug),
            None => format!("{}/", origin),
        };

        Self { prefix }
    }

    /// Build a sandbox from an explicit prefix string
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Check if a URL is inside the sandbox
    pub fn allows(&self, url: &Url) -> bool {
        url.as_str().starts_with(&self.prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }
}

/// Create a normalized version of the URL (fragment removed)
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

/// Origin of a URL with a trailing slash, used as a document `<base>`
pub fn origin_base(url: &Url) -> String {
    format!("{}/", &url[..Position::BeforePath])
}

/// Run-scoped set of normalized URLs. Only ever grows.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL as visited. Returns false if it was already there.
    pub fn insert(&mut self, url: &Url) -> bool {
        let normalized = normalize_url(url);
        if self.seen.contains(normalized.as_str()) {
            ::log::trace!("Skipping already visited: {}", normalized);
            return false;
        }
        self.seen.insert(normalized.into());
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.seen.len()
    }
}

/// Parse a URL list: one URL per line, blank lines and `#` comments ignored.
/// Order and duplicates are preserved; the traversal skips repeats.
pub fn parse_url_list(contents: &str) -> Result<Vec<Url>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Url::parse(line).map_err(|e| ScrapeError::invalid_url(line, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_prefix_uses_first_path_segment() {
        let sandbox =
            UrlSandbox::from_start_url(&url("https://www.example.com/some-game/Prologue?x=1"));
        assert_eq!(sandbox.as_str(), "https://www.example.com/some-game/");

        assert!(sandbox.allows(&url("https://www.example.com/some-game/Chapter_1")));
        assert!(!sandbox.allows(&url("https://www.example.com/other-game/Chapter_1")));
        assert!(!sandbox.allows(&url("http://www.example.com/some-game/Chapter_1")));
        assert!(!sandbox.allows(&url("https://cdn.example.com/some-game/Chapter_1")));
    }

    #[test]
    fn test_prefix_without_path() {
        let sandbox = UrlSandbox::from_start_url(&url("https://example.com"));
        assert_eq!(sandbox.as_str(), "https://example.com/");

        let sandbox = UrlSandbox::from_start_url(&url("https://example.com//guide/page"));
        assert_eq!(sandbox.as_str(), "https://example.com/guide/");
    }

    #[test]
    fn test_prefix_keeps_port() {
        let sandbox = UrlSandbox::from_start_url(&url("http://127.0.0.1:8080/walk/1"));
        assert_eq!(sandbox.as_str(), "http://127.0.0.1:8080/walk/");
    }

    #[test]
    fn test_normalize_strips_fragment() {
        let normalized = normalize_url(&url("https://example.com/a/b?q=1#section"));
        assert_eq!(normalized.as_str(), "https://example.com/a/b?q=1");
    }

    #[test]
    fn test_origin_base() {
        assert_eq!(
            origin_base(&url("https://example.com:8443/a/b")),
            "https://example.com:8443/"
        );
    }

    #[test]
    fn test_visited_set_ignores_fragments() {
        let mut visited = VisitedSet::new();
        assert_eq!(visited.len(), 0);
        assert!(visited.insert(&url("https://example.com/a/1")));
        assert!(!visited.insert(&url("https://example.com/a/1#top")));
        assert!(!visited.insert(&url("https://example.com/a/1#bottom")));
        assert!(visited.insert(&url("https://example.com/a/2")));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_parse_url_list() {
        let list = parse_url_list(
            "# chapters\n\nhttps://example.com/g/1\n  https://example.com/g/2  \n#https://example.com/g/x\nhttps://example.com/g/1\n",
        )
        .unwrap();
        let urls: Vec<&str> = list.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/g/1",
                "https://example.com/g/2",
                "https://example.com/g/1"
            ]
        );
    }

    #[test]
    fn test_parse_url_list_rejects_relative_lines() {
        assert!(matches!(
            parse_url_list("https://example.com/g/1\n/g/2"),
            Err(ScrapeError::InvalidUrl { .. })
        ));
        assert!(parse_url_list("# only comments\n\n").unwrap().is_empty());
    }
}
