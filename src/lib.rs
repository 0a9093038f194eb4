// Re-export modules
pub mod assets;
pub mod browser;
pub mod config;
pub mod crawlers;
pub mod document;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use error::{Result, ScrapeError};
pub use results::{ExitStatus, ScrapedPage, StopReason};

use assets::{HttpFetcher, Localizer};
use browser::WebDriverSession;
use crawlers::{Targets, Traversal, TraversalConfig, TraversalReport, cancellable};
use document::{Cover, build_document, document_title, pages_from_saved_folder};
use filter::{origin_base, parse_url_list};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use url::Url;

/// Where the pages of a walkthrough come from
#[derive(Debug, Clone)]
pub enum Source {
    /// First page of the walkthrough; the rest is discovered via next links
    StartUrl(String),
    /// File with one URL per line, visited in order
    UrlList(PathBuf),
    /// Folder of manually saved HTML pages; no browsing at all
    SavedHtml(PathBuf),
}

/// Summary of a finished run
#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    /// Number of pages that made it into the document
    pub pages: usize,
    /// Why the traversal ended, when there was one
    pub stop: Option<StopReason>,
    pub pdf: Option<PathBuf>,
    /// Combined HTML written on the way to the PDF
    pub html: Option<PathBuf>,
    /// Pages collected before an abnormal stop
    pub partial_html: Option<PathBuf>,
}

/// What is left to do once a traversal has ended
#[derive(Debug)]
enum Settled {
    Done(RunOutcome),
    Publish(Vec<ScrapedPage>, StopReason),
}

impl RunOutcome {
    fn stopped(status: ExitStatus, pages: usize, stop: StopReason) -> Self {
        Self {
            status,
            pages,
            stop: Some(stop),
            pdf: None,
            html: None,
            partial_html: None,
        }
    }
}

/// Main builder for turning a walkthrough into one PDF
pub struct Walkthrough {
    source: Source,
    output: PathBuf,
    config: ScraperConfig,
}

impl Walkthrough {
    /// Create a new builder writing the PDF to `output`
    pub fn new(source: Source, output: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output: output.into(),
            config: ScraperConfig::default(),
        }
    }

    /// Set the safety cap on recorded pages
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Run the browser headless; verification pages then end the run
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the whole configuration
    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = ScraperConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = ScraperConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Run the whole pipeline: traverse, assemble, optionally localize, render.
    ///
    /// Stops that are not errors (nothing extracted, blocked, interrupted)
    /// come back as an [`RunOutcome`] with the matching status.
    pub async fn run(self) -> Result<RunOutcome> {
        match &self.source {
            Source::StartUrl(start) => {
                let start = Url::parse(start).map_err(|e| ScrapeError::invalid_url(start, e))?;
                self.scrape(Targets::Chase(start.clone()), start).await
            }
            Source::UrlList(path) => {
                let urls = parse_url_list(&tokio::fs::read_to_string(path).await?)?;
                let Some(start) = urls.first().cloned() else {
                    return Err(ScrapeError::EmptyUrlList(path.clone()));
                };
                ::log::info!("Loaded {} URLs from {}", urls.len(), path.display());
                self.scrape(Targets::List(urls), start).await
            }
            Source::SavedHtml(dir) => self.combine_saved(dir).await,
        }
    }

    async fn scrape(&self, targets: Targets, start: Url) -> Result<RunOutcome> {
        ::log::info!("Starting walkthrough scrape at {}", start);
        let mut session = WebDriverSession::connect(&self.config).await?;

        // Listens until the PDF is written, not just during the traversal
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut cancel = cancel_rx.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ::log::warn!("Interrupt received, stopping");
                let _ = cancel_tx.send(true);
            }
        });

        let report = Traversal::new(&mut session, TraversalConfig::from(&self.config), cancel_rx)
            .run(targets)
            .await;

        let outcome = self
            .finish(&mut session, report, &start, &mut cancel)
            .await;
        interrupt.abort();
        session.close().await;
        outcome
    }

    async fn finish(
        &self,
        session: &mut WebDriverSession,
        report: TraversalReport,
        start: &Url,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<RunOutcome> {
        let (pages, stop) = match self.settle(report.pages, report.stop, start).await? {
            Settled::Done(outcome) => return Ok(outcome),
            Settled::Publish(pages, stop) => (pages, stop),
        };

        let title = document_title(&pages);
        let cover = scraped_cover(&title, start);
        let base = origin_base(start);
        let publishing = self.publish(session, &cover, &pages, Some(&base), Some(start.as_str()));

        let Some(published) = cancellable(cancel, publishing).await else {
            ::log::warn!("Interrupted before the PDF was written");
            return self.save_partial(pages, StopReason::Interrupted, start).await;
        };
        let (html, pdf) = published?;

        Ok(RunOutcome {
            status: ExitStatus::from(&stop),
            pages: pages.len(),
            stop: Some(stop),
            pdf: Some(pdf),
            html: Some(html),
            partial_html: None,
        })
    }

    /// Decides what a finished traversal leaves to do.
    ///
    /// A normal stop without pages means nothing was extracted (exit 1); an
    /// abort keeps its own status. Pages collected before an abort are saved
    /// next to the output as `<stem>.partial.html`. Only a normal stop with
    /// pages goes on to publishing.
    async fn settle(
        &self,
        pages: Vec<ScrapedPage>,
        stop: StopReason,
        start: &Url,
    ) -> Result<Settled> {
        if pages.is_empty() {
            let status = match ExitStatus::from(&stop) {
                ExitStatus::Success => ExitStatus::NothingExtracted,
                status => status,
            };
            return Ok(Settled::Done(RunOutcome::stopped(status, 0, stop)));
        }

        if stop.is_abort() {
            return self.save_partial(pages, stop, start).await.map(Settled::Done);
        }

        Ok(Settled::Publish(pages, stop))
    }

    async fn save_partial(
        &self,
        pages: Vec<ScrapedPage>,
        stop: StopReason,
        start: &Url,
    ) -> Result<RunOutcome> {
        let title = document_title(&pages);
        let html = build_document(
            &scraped_cover(&title, start),
            &pages,
            Some(&origin_base(start)),
        );

        let partial = utils::sibling_with_suffix(&self.output, "partial.html");
        write_text(&partial, &html).await?;
        ::log::warn!(
            "Saved {} collected pages to {}",
            pages.len(),
            partial.display()
        );

        let mut outcome = RunOutcome::stopped(ExitStatus::from(&stop), pages.len(), stop);
        outcome.partial_html = Some(partial);
        Ok(outcome)
    }

    async fn combine_saved(&self, dir: &Path) -> Result<RunOutcome> {
        let pages = pages_from_saved_folder(dir)?;
        ::log::info!("Combining {} saved pages from {}", pages.len(), dir.display());

        let absolute = std::path::absolute(dir)?;
        let base = Url::from_directory_path(&absolute).ok().map(String::from);
        let title = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| document_title(&pages));
        let start = absolute.display().to_string();
        let cover = Cover {
            title: &title,
            start_url: &start,
            generated_at: chrono::Local::now().naive_local(),
        };

        let mut session = WebDriverSession::connect(&self.config).await?;
        let published = self
            .publish(&mut session, &cover, &pages, base.as_deref(), None)
            .await;
        session.close().await;
        let (html, pdf) = published?;

        Ok(RunOutcome {
            status: ExitStatus::Success,
            pages: pages.len(),
            stop: None,
            pdf: Some(pdf),
            html: Some(html),
            partial_html: None,
        })
    }

    /// Assemble, optionally localize, write the HTML and print it to the PDF.
    /// Returns the HTML and PDF paths.
    async fn publish(
        &self,
        session: &mut WebDriverSession,
        cover: &Cover<'_>,
        pages: &[ScrapedPage],
        base: Option<&str>,
        referer: Option<&str>,
    ) -> Result<(PathBuf, PathBuf)> {
        let html_path = if self.config.localize_assets {
            let dir = self
                .config
                .assets_dir
                .clone()
                .unwrap_or_else(|| output_dir(&self.output).to_path_buf());
            let html = build_document(cover, pages, None);

            let user_agent = session
                .user_agent()
                .await
                .unwrap_or_else(|| self.config.user_agent.clone());
            let fetcher = HttpFetcher::new(
                self.config.download_timeout(),
                &user_agent,
                referer.map(str::to_string),
                session.cookies().await,
            )?;

            let mut localizer = Localizer::new(fetcher, &dir);
            let (html, downloaded) = localizer.localize(&html).await?;
            println!(
                "Localized {} assets into {}",
                downloaded,
                dir.join(assets::ASSET_SUBDIR).display()
            );

            let path = dir.join(format!("{}.html", output_stem(&self.output)));
            write_text(&path, &html).await?;
            if let Some(save_html) = &self.config.save_html {
                write_text(save_html, &html).await?;
            }
            path
        } else {
            let html = build_document(cover, pages, base);
            let path = self
                .config
                .save_html
                .clone()
                .unwrap_or_else(|| utils::sibling_with_suffix(&self.output, "html"));
            write_text(&path, &html).await?;
            path
        };
        ::log::info!("Wrote combined HTML to {}", html_path.display());

        let pdf = session.render_pdf(&html_path).await?;
        if let Some(parent) = non_empty_parent(&self.output) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.output, pdf).await?;
        println!("Wrote PDF: {}", self.output.display());

        Ok((html_path, self.output.clone()))
    }
}

fn scraped_cover<'a>(title: &'a str, start: &'a Url) -> Cover<'a> {
    Cover {
        title,
        start_url: start.as_str(),
        generated_at: chrono::Local::now().naive_local(),
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn output_dir(output: &Path) -> &Path {
    non_empty_parent(output).unwrap_or(Path::new("."))
}

fn output_stem(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "walkthrough".to_string())
}

async fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = non_empty_parent(path) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}
