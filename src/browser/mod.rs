//! Page-rendering engine boundary.
//!
//! The traversal only needs two capabilities from a browser: load a URL and
//! read back what it rendered. Everything else works on [`PageSnapshot`]s.

pub mod webdriver;

pub use webdriver::WebDriverSession;

use crate::error::BrowserError;
use serde::{Deserialize, Serialize};

/// Script run against a committed page to capture a snapshot.
pub const SNAPSHOT_SCRIPT: &str = r#"
return {
  url: location.href,
  title: document.title || '',
  html: document.documentElement ? document.documentElement.outerHTML : '',
  bodyText: document.body ? document.body.innerText : null
};
"#;

/// Read-only structural capture of a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Current location after redirects
    pub url: String,

    /// Document title
    #[serde(default)]
    pub title: String,

    /// Serialized document
    #[serde(default)]
    pub html: String,

    /// Rendered visible text of `<body>`, when the engine could provide it
    #[serde(default)]
    pub body_text: Option<String>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            html: html.into(),
            body_text: None,
        }
    }
}

/// Capability the traversal driver consumes.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Navigate to `url` and wait for the page to settle.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Capture the currently displayed page.
    async fn snapshot(&mut self) -> Result<PageSnapshot, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_decodes_script_result() {
        let value = serde_json::json!({
            "url": "https://example.com/a/1",
            "title": "Page",
            "html": "<html></html>",
            "bodyText": "Hello"
        });
        let snapshot: PageSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(snapshot.url, "https://example.com/a/1");
        assert_eq!(snapshot.body_text.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_snapshot_tolerates_missing_fields() {
        let value = serde_json::json!({ "url": "https://example.com/", "bodyText": null });
        let snapshot: PageSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(snapshot.title, "");
        assert!(snapshot.body_text.is_none());
    }
}
