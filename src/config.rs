use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a scraping run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Safety cap on the number of recorded pages
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Delay in seconds between page visits
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    /// CSS selector for the main content container, tried before the built-in list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Run the browser headless. No interactive verification is possible then.
    #[serde(default)]
    pub headless: bool,

    /// Browser profile directory, so site verification is solved once across runs
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,

    /// Debugger address (`host:port`) of an already running browser to attach to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_to: Option<String>,

    /// User agent for the launched browser and for asset downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// How long to wait for a human to clear a verification page
    #[serde(default = "default_challenge_timeout_secs")]
    pub challenge_timeout_secs: u64,

    #[serde(default = "default_challenge_poll_interval_ms")]
    pub challenge_poll_interval_ms: u64,

    /// Verification pages on this many navigations in a row end the run
    #[serde(default = "default_max_consecutive_challenges")]
    pub max_consecutive_challenges: u32,

    /// Attempts to read a loaded page back before giving up on it
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Download referenced images and rewrite them to local paths
    #[serde(default)]
    pub localize_assets: bool,

    /// Directory receiving the localized HTML and its `assets/` folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,

    /// Where to save the combined HTML before rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_html: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            max_pages: default_max_pages(),
            delay_secs: default_delay_secs(),
            selector: None,
            headless: false,
            profile_dir: default_profile_dir(),
            attach_to: None,
            user_agent: default_user_agent(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            challenge_timeout_secs: default_challenge_timeout_secs(),
            challenge_poll_interval_ms: default_challenge_poll_interval_ms(),
            max_consecutive_challenges: default_max_consecutive_challenges(),
            read_retries: default_read_retries(),
            download_timeout_secs: default_download_timeout_secs(),
            localize_assets: false,
            assets_dir: None,
            save_html: None,
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    /// Verification pages can only be solved by a human in a visible browser
    pub fn interactive(&self) -> bool {
        !self.headless
    }

    pub fn delay(&self) -> Duration {
        if self.delay_secs.is_finite() && self.delay_secs > 0.0 {
            Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }

    pub fn challenge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.challenge_poll_interval_ms.max(1))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_max_pages() -> usize {
    300
}

fn default_delay_secs() -> f64 {
    1.0
}

fn default_profile_dir() -> PathBuf {
    PathBuf::from(".profile")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_challenge_timeout_secs() -> u64 {
    300
}

fn default_challenge_poll_interval_ms() -> u64 {
    2000
}

fn default_max_consecutive_challenges() -> u32 {
    3
}

fn default_read_retries() -> u32 {
    3
}

fn default_download_timeout_secs() -> u64 {
    60
}
