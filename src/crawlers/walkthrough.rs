use crate::browser::{Browser, PageSnapshot};
use crate::config::ScraperConfig;
use crate::filter::{UrlSandbox, VisitedSet};
use crate::parsers::{self, RenderedPage};
use crate::results::{ScrapedPage, StopReason};
use scraper::Html;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use url::Url;

/// What to visit
#[derive(Debug, Clone)]
pub enum Targets {
    /// Start here and keep following the discovered "next" link
    Chase(Url),
    /// Visit exactly these pages in order; no discovery
    List(Vec<Url>),
}

/// Knobs of one traversal, usually derived from [`ScraperConfig`]
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    pub max_pages: usize,
    pub delay: Duration,
    pub selector: Option<String>,
    /// Whether a human can clear verification pages in the browser
    pub interactive: bool,
    pub challenge_timeout: Duration,
    pub poll_interval: Duration,
    pub max_consecutive_challenges: u32,
    pub read_retries: u32,
}

impl From<&ScraperConfig> for TraversalConfig {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            delay: config.delay(),
            selector: config.selector.clone(),
            interactive: config.interactive(),
            challenge_timeout: config.challenge_timeout(),
            poll_interval: config.challenge_poll_interval(),
            max_consecutive_challenges: config.max_consecutive_challenges,
            read_retries: config.read_retries,
        }
    }
}

/// Outcome of a traversal: everything collected, and why it ended
#[derive(Debug)]
pub struct TraversalReport {
    pub pages: Vec<ScrapedPage>,
    pub stop: StopReason,
}

/// Sequential page-by-page walk over one browser session.
///
/// Pages are visited strictly one at a time: navigate, settle, check for a
/// verification page, extract, then pick the next target. Setting the
/// cancellation flag stops the walk at the next suspension point and keeps
/// what was collected.
pub struct Traversal<'a, B> {
    browser: &'a mut B,
    config: TraversalConfig,
    cancel: watch::Receiver<bool>,
    visited: VisitedSet,
    pages: Vec<ScrapedPage>,
    consecutive_challenges: u32,
}

/// Extraction and next-link decision of one loaded page
struct PageAnalysis {
    page: ScrapedPage,
    text_len: usize,
    next: Option<Url>,
}

impl<'a, B: Browser> Traversal<'a, B> {
    pub fn new(browser: &'a mut B, config: TraversalConfig, cancel: watch::Receiver<bool>) -> Self {
        Self {
            browser,
            config,
            cancel,
            visited: VisitedSet::new(),
            pages: Vec::new(),
            consecutive_challenges: 0,
        }
    }

    pub async fn run(mut self, targets: Targets) -> TraversalReport {
        let stop = self.drive(targets).await;

        ::log::info!(
            "Traversal stopped after {} pages ({} URLs visited): {:?}",
            self.pages.len(),
            self.visited.len(),
            stop
        );

        TraversalReport {
            pages: self.pages,
            stop,
        }
    }

    async fn drive(&mut self, targets: Targets) -> StopReason {
        let (mut queue, sandbox) = match targets {
            Targets::Chase(start) => {
                let sandbox = UrlSandbox::from_start_url(&start);
                ::log::info!("Following next links inside {}", sandbox.as_str());
                (VecDeque::from([start]), Some(sandbox))
            }
            Targets::List(urls) => (VecDeque::from(urls), None),
        };

        while let Some(url) = queue.pop_front() {
            if *self.cancel.borrow() {
                return StopReason::Interrupted;
            }
            if self.pages.len() >= self.config.max_pages {
                ::log::info!("Reached the page cap of {}", self.config.max_pages);
                return StopReason::PageCap;
            }
            if !self.visited.insert(&url) {
                if sandbox.is_some() {
                    ::log::info!("Next link leads back to {}, stopping", url);
                    return StopReason::Revisit(url.to_string());
                }
                ::log::warn!("Skipping duplicate URL in list: {}", url);
                continue;
            }

            if !self.pages.is_empty() && self.pause(self.config.delay).await.is_none() {
                return StopReason::Interrupted;
            }

            let snapshot = match self.load(&url).await {
                Ok(snapshot) => snapshot,
                Err(stop) => return stop,
            };

            let analysis = analyze(
                &snapshot,
                &url,
                self.config.selector.as_deref(),
                sandbox.as_ref(),
            );

            println!(
                "[{}] {} ({} chars) - {}",
                self.pages.len() + 1,
                analysis.page.title,
                analysis.text_len,
                analysis.page.url
            );
            self.pages.push(analysis.page);

            if sandbox.is_some() {
                match analysis.next {
                    Some(next) => queue.push_back(next),
                    None => ::log::info!("No next link on {}", url),
                }
            }
        }

        StopReason::Exhausted
    }

    /// Navigate to `url` and return a snapshot that is not a verification page
    async fn load(&mut self, url: &Url) -> Result<PageSnapshot, StopReason> {
        loop {
            self.navigate(url).await?;
            let snapshot = self.read(url).await?;

            if !parsers::is_challenge(&snapshot) {
                self.consecutive_challenges = 0;
                return Ok(snapshot);
            }

            self.consecutive_challenges += 1;
            ::log::warn!(
                "Verification page on {} ({} in a row)",
                url,
                self.consecutive_challenges
            );

            if !self.config.interactive {
                return Err(StopReason::ChallengeUnattended {
                    url: url.to_string(),
                });
            }
            if self.consecutive_challenges >= self.config.max_consecutive_challenges {
                return Err(StopReason::ChallengeBlocked {
                    url: url.to_string(),
                    detections: self.consecutive_challenges,
                });
            }

            self.await_clearance(url).await?;
            ::log::info!("Verification cleared, reloading {}", url);
        }
    }

    async fn navigate(&mut self, url: &Url) -> Result<(), StopReason> {
        ::log::debug!("Navigating to {}", url);
        match cancellable(&mut self.cancel, self.browser.navigate(url.as_str())).await {
            None => Err(StopReason::Interrupted),
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                ::log::error!("Failed to load {}: {}", url, e);
                Err(StopReason::NavigationFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Snapshot the loaded page, retrying transient read errors
    async fn read(&mut self, url: &Url) -> Result<PageSnapshot, StopReason> {
        let mut attempts = 0;
        loop {
            match cancellable(&mut self.cancel, self.browser.snapshot()).await {
                None => return Err(StopReason::Interrupted),
                Some(Ok(snapshot)) => return Ok(snapshot),
                Some(Err(e)) if attempts < self.config.read_retries => {
                    attempts += 1;
                    ::log::warn!(
                        "Failed to read {} (attempt {}/{}): {}",
                        url,
                        attempts,
                        self.config.read_retries,
                        e
                    );
                    self.pause(self.config.poll_interval)
                        .await
                        .ok_or(StopReason::Interrupted)?;
                }
                Some(Err(e)) => {
                    return Err(StopReason::ReadFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Poll until the verification page goes away or the timeout passes.
    /// A failed read counts as cleared; the caller reloads and checks again.
    async fn await_clearance(&mut self, url: &Url) -> Result<(), StopReason> {
        ::log::warn!(
            "Complete the verification in the browser window. Waiting up to {}s...",
            self.config.challenge_timeout.as_secs()
        );

        let deadline = Instant::now() + self.config.challenge_timeout;
        while Instant::now() < deadline {
            self.pause(self.config.poll_interval)
                .await
                .ok_or(StopReason::Interrupted)?;

            match cancellable(&mut self.cancel, self.browser.snapshot()).await {
                None => return Err(StopReason::Interrupted),
                Some(Ok(snapshot)) if parsers::is_challenge(&snapshot) => continue,
                Some(Ok(_)) => return Ok(()),
                Some(Err(e)) => {
                    ::log::debug!("Read during verification wait failed: {}", e);
                    return Ok(());
                }
            }
        }

        ::log::error!("Verification on {} did not clear in time", url);
        Err(StopReason::ChallengeTimeout {
            url: url.to_string(),
        })
    }

    /// Sleep unless cancelled; `None` means cancelled
    async fn pause(&mut self, duration: Duration) -> Option<()> {
        cancellable(&mut self.cancel, tokio::time::sleep(duration)).await
    }
}

/// Parse the snapshot once and run the extractor and navigation resolver on it
fn analyze(
    snapshot: &PageSnapshot,
    requested: &Url,
    selector: Option<&str>,
    sandbox: Option<&UrlSandbox>,
) -> PageAnalysis {
    let rendered = RenderedPage::from_snapshot(snapshot).unwrap_or_else(|_| RenderedPage {
        url: requested.clone(),
        title: snapshot.title.clone(),
        document: Html::parse_document(&snapshot.html),
    });

    let extraction = parsers::extract(&rendered, selector);
    if extraction.text_len == 0 {
        ::log::warn!("No usable text on {}", rendered.url);
    }

    let next = sandbox.and_then(|sandbox| parsers::find_next(&rendered, sandbox));

    PageAnalysis {
        page: ScrapedPage::new(
            rendered.url.to_string(),
            extraction.title,
            extraction.content_html,
        ),
        text_len: extraction.text_len,
        next,
    }
}

/// Resolves once the flag is set; never resolves if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run `fut` unless the cancellation flag is set first
pub async fn cancellable<F: Future>(
    cancel: &mut watch::Receiver<bool>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => None,
        output = fut => Some(output),
    }
}
