use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One successfully extracted page of a walkthrough
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// URL the page was loaded from
    pub url: String,

    /// Display title
    pub title: String,

    /// Cleaned, self-contained content fragment
    pub content_html: String,
}

impl ScrapedPage {
    /// Create a new scraped page
    pub fn new(url: String, title: String, content_html: String) -> Self {
        Self {
            url,
            title,
            content_html,
        }
    }
}

/// What the content extractor found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: String,
    pub content_html: String,
    /// Selector of the chosen container, empty when nothing matched
    pub selector: String,
    /// Whitespace-collapsed visible text length of the chosen container
    pub text_len: usize,
}

/// Why a traversal ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No next link was found, or the URL list ran out
    Exhausted,
    /// The configured page cap was reached
    PageCap,
    /// Discovery led back to an already visited URL
    Revisit(String),
    /// The operator interrupted the run
    Interrupted,
    /// Verification pages kept coming back on repeated navigations
    ChallengeBlocked { url: String, detections: u32 },
    /// A verification page appeared with no one around to solve it
    ChallengeUnattended { url: String },
    /// Interactive verification did not clear in time
    ChallengeTimeout { url: String },
    /// The browser failed to load a page
    NavigationFailed { url: String, reason: String },
    /// The page loaded but could not be read back
    ReadFailed { url: String, reason: String },
}

impl StopReason {
    /// Whether the traversal ended abnormally
    pub fn is_abort(&self) -> bool {
        !matches!(
            self,
            StopReason::Exhausted | StopReason::PageCap | StopReason::Revisit(_)
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "no further pages"),
            StopReason::PageCap => write!(f, "page cap reached"),
            StopReason::Revisit(url) => write!(f, "next link leads back to {}", url),
            StopReason::Interrupted => write!(f, "interrupted by the operator"),
            StopReason::ChallengeBlocked { url, detections } => write!(
                f,
                "verification page on {} came back {} times in a row; the site is blocking automation",
                url, detections
            ),
            StopReason::ChallengeUnattended { url } => write!(
                f,
                "verification page on {} in headless mode; rerun without --headless to complete it in the browser window",
                url
            ),
            StopReason::ChallengeTimeout { url } => {
                write!(f, "verification page on {} was not completed in time", url)
            }
            StopReason::NavigationFailed { url, reason } => {
                write!(f, "failed to load {}: {}", url, reason)
            }
            StopReason::ReadFailed { url, reason } => {
                write!(f, "failed to read {}: {}", url, reason)
            }
        }
    }
}

/// Process exit signal of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    NothingExtracted,
    Blocked,
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::NothingExtracted => 1,
            ExitStatus::Blocked => 2,
            ExitStatus::Interrupted => 130,
        }
    }
}

impl From<&StopReason> for ExitStatus {
    fn from(reason: &StopReason) -> Self {
        match reason {
            StopReason::Exhausted | StopReason::PageCap | StopReason::Revisit(_) => {
                ExitStatus::Success
            }
            StopReason::Interrupted => ExitStatus::Interrupted,
            StopReason::ChallengeBlocked { .. }
            | StopReason::ChallengeUnattended { .. }
            | StopReason::ChallengeTimeout { .. }
            | StopReason::NavigationFailed { .. }
            | StopReason::ReadFailed { .. } => ExitStatus::Blocked,
        }
    }
}

/// Exit status of a run that ended in an error.
///
/// Browser errors (no WebDriver, a failed print) are connection failures
/// and map to 2. Everything else maps to 1, including I/O errors while
/// writing the HTML or PDF after pages were scraped, since no usable
/// document came out of the run.
impl From<&ScrapeError> for ExitStatus {
    fn from(error: &ScrapeError) -> Self {
        match error {
            ScrapeError::Browser(_) => ExitStatus::Blocked,
            _ => ExitStatus::NothingExtracted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::from(&StopReason::Exhausted).code(), 0);
        assert_eq!(ExitStatus::from(&StopReason::PageCap).code(), 0);
        assert_eq!(ExitStatus::from(&StopReason::Interrupted).code(), 130);
        assert_eq!(
            ExitStatus::from(&StopReason::ChallengeUnattended {
                url: "https://example.com/a".to_string()
            })
            .code(),
            2
        );
        assert_eq!(ExitStatus::NothingExtracted.code(), 1);
    }

    #[test]
    fn test_abort_classification() {
        assert!(!StopReason::Revisit("https://example.com/a".to_string()).is_abort());
        assert!(StopReason::Interrupted.is_abort());
        assert!(
            StopReason::ChallengeBlocked {
                url: "https://example.com/a".to_string(),
                detections: 3
            }
            .is_abort()
        );
    }

    #[test]
    fn test_error_exit_status() {
        let connect = ScrapeError::Browser(crate::error::BrowserError::Connect {
            url: "http://localhost:4444".to_string(),
            reason: "connection refused".to_string(),
        });
        assert_eq!(ExitStatus::from(&connect).code(), 2);

        let empty = ScrapeError::EmptyUrlList("urls.txt".into());
        assert_eq!(ExitStatus::from(&empty).code(), 1);

        let write = ScrapeError::from(std::io::Error::other("disk full"));
        assert_eq!(ExitStatus::from(&write).code(), 1);
    }

    #[test]
    fn test_stop_reason_messages() {
        let unattended = StopReason::ChallengeUnattended {
            url: "https://example.com/a".to_string(),
        };
        assert!(unattended.to_string().contains("--headless"));
        assert_eq!(StopReason::PageCap.to_string(), "page cap reached");
    }
}
