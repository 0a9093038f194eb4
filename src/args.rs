use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use walkthrough_scraper::{ScraperConfig, Source};

#[derive(Parser, Debug)]
#[command(name = "walkthrough-scraper")]
#[command(about = "Scrape a paged walkthrough into a single offline PDF")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["start", "urls", "saved_html"])))]
pub struct Args {
    /// Start URL (first page of the walkthrough); next pages are discovered
    #[arg(long)]
    pub start: Option<String>,

    /// File with one URL per line, visited in order without discovery
    #[arg(long)]
    pub urls: Option<PathBuf>,

    /// Folder of manually saved .html/.htm pages to combine instead of scraping
    #[arg(long)]
    pub saved_html: Option<PathBuf>,

    /// Output PDF path
    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON configuration file; command-line flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Safety cap to avoid infinite loops
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Delay in seconds between pages
    #[arg(long)]
    pub delay: Option<f64>,

    /// CSS selector for the main content container, tried first
    #[arg(long)]
    pub selector: Option<String>,

    /// Run headless. Verification pages then stop the run.
    #[arg(long)]
    pub headless: bool,

    /// Seconds to wait for a verification page to be completed by hand
    #[arg(long)]
    pub verification_timeout: Option<u64>,

    /// Also save the combined HTML here before rendering
    #[arg(long)]
    pub save_html: Option<PathBuf>,

    /// Download images and point the document at the local copies
    #[arg(long)]
    pub localize_assets: bool,

    /// Folder receiving the localized HTML and its assets/ (default: next to the output)
    #[arg(long, requires = "localize_assets")]
    pub assets_dir: Option<PathBuf>,

    /// Attach to a running Chrome at this debugger address (host:port)
    #[arg(long)]
    pub attach: Option<String>,

    /// Browser profile directory, keeps cookies so verification is needed once
    #[arg(long)]
    pub profile_dir: Option<PathBuf>,

    /// WebDriver endpoint (also read from WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,
}

impl Args {
    pub fn source(&self) -> Option<Source> {
        if let Some(start) = &self.start {
            return Some(Source::StartUrl(start.clone()));
        }
        if let Some(urls) = &self.urls {
            return Some(Source::UrlList(urls.clone()));
        }
        self.saved_html.clone().map(Source::SavedHtml)
    }

    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut ScraperConfig) {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(selector) = &self.selector {
            config.selector = Some(selector.clone());
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(timeout) = self.verification_timeout {
            config.challenge_timeout_secs = timeout;
        }
        if let Some(path) = &self.save_html {
            config.save_html = Some(path.clone());
        }
        if self.localize_assets {
            config.localize_assets = true;
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = Some(dir.clone());
        }
        if let Some(attach) = &self.attach {
            config.attach_to = Some(attach.clone());
        }
        if let Some(dir) = &self.profile_dir {
            config.profile_dir = dir.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_exactly_one_source() {
        assert!(Args::try_parse_from(["walkthrough-scraper", "-o", "out.pdf"]).is_err());
        assert!(
            Args::try_parse_from([
                "walkthrough-scraper",
                "--start",
                "https://example.com/g/1",
                "--urls",
                "urls.txt",
                "-o",
                "out.pdf",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "walkthrough-scraper",
            "--start",
            "https://example.com/g/1",
            "--output",
            "out.pdf",
            "--max-pages",
            "7",
            "--headless",
            "--verification-timeout",
            "30",
            "--localize-assets",
            "--assets-dir",
            "offline",
        ])
        .unwrap();

        let mut config = ScraperConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.max_pages, 7);
        assert!(config.headless);
        assert_eq!(config.challenge_timeout_secs, 30);
        assert!(config.localize_assets);
        assert_eq!(config.assets_dir, Some(PathBuf::from("offline")));
        assert_eq!(config.delay_secs, 1.0);
        assert!(matches!(args.source(), Some(Source::StartUrl(_))));
    }
}
