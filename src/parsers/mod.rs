//! Heuristics over a rendered page.
//!
//! Each parser is a pure function of a [`RenderedPage`]: the parsed document
//! plus the location it was rendered at.

pub mod challenge;
pub mod content;
pub mod html;
pub mod navigation;

#[cfg(test)]
mod tests;

use crate::browser::PageSnapshot;
use scraper::Html;
use url::Url;

pub use challenge::is_challenge;
pub use content::extract;
pub use navigation::find_next;

/// A page snapshot parsed and ready for querying
pub struct RenderedPage {
    /// Location the document was rendered at
    pub url: Url,
    /// Document title as reported by the browser
    pub title: String,
    pub document: Html,
}

impl RenderedPage {
    /// Parses a snapshot. Fails only if the snapshot URL is not absolute.
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Result<Self, url::ParseError> {
        Self::parse(&snapshot.url, &snapshot.title, &snapshot.html)
    }

    pub fn parse(url: &str, title: &str, html: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        Ok(Self {
            url,
            title: title.to_string(),
            document: Html::parse_document(html),
        })
    }

    /// Resolve a reference found on the page against its location
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        self.url.join(reference.trim()).ok()
    }
}
