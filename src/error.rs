//! Error types for the scraper.
//!
//! Heuristic components never return these; only the browser boundary, the
//! asset fetcher and the run orchestration do.

use std::path::PathBuf;
use std::time::Duration;

/// Failures reported by the page-rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Could not open a session against the WebDriver endpoint.
    #[error(
        "failed to connect to WebDriver at {url}: {reason}. Start a WebDriver server \
         (e.g. `chromedriver --port=4444`) or set the WEBDRIVER_URL environment variable"
    )]
    Connect { url: String, reason: String },

    /// A WebDriver command failed.
    #[error("browser command failed while {context}: {reason}")]
    Command { context: String, reason: String },

    /// Navigation or settling did not finish in time.
    #[error("timed out after {0:?} waiting for the page to settle")]
    Timeout(Duration),

    /// The snapshot script returned something we could not decode.
    #[error("malformed page snapshot: {0}")]
    MalformedSnapshot(String),

    /// Printing the document to PDF failed.
    #[error("failed to render PDF: {0}")]
    Render(String),
}

impl BrowserError {
    pub(crate) fn command(context: &str, error: impl std::fmt::Display) -> Self {
        BrowserError::Command {
            context: context.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Failures of a single asset download. Never fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("response body was empty")]
    EmptyBody,
}

/// Top-level error for a scraping run.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("asset download setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("URL list {0} contains no URLs")]
    EmptyUrlList(PathBuf),

    #[error("no .html or .htm files found in {0}")]
    NoSavedPages(PathBuf),
}

impl ScrapeError {
    pub(crate) fn invalid_url(url: &str, source: url::ParseError) -> Self {
        ScrapeError::InvalidUrl {
            url: url.to_string(),
            source,
        }
    }
}

/// Result type alias for scraping operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;
