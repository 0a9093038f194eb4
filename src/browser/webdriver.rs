use super::{Browser, PageSnapshot, SNAPSHOT_SCRIPT};
use crate::assets::fetch::SessionCookie;
use crate::config::ScraperConfig;
use crate::error::BrowserError;
use fantoccini::wd::{PrintConfiguration, PrintMargins, PrintSize};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

const SETTLE_POLL: Duration = Duration::from_millis(250);

/// A browser session driven over WebDriver
pub struct WebDriverSession {
    client: Client,
    navigation_timeout: Duration,
    /// Attached to a browser someone else started; closing is their business
    attached: bool,
}

impl WebDriverSession {
    /// Connects to the WebDriver endpoint described by the configuration
    pub async fn connect(config: &ScraperConfig) -> Result<Self, BrowserError> {
        let capabilities = build_capabilities(config);

        let client = match connect_to_webdriver(&config.webdriver_url, &capabilities).await {
            Ok(client) => client,
            Err(reason) => {
                return Err(BrowserError::Connect {
                    url: config.webdriver_url.clone(),
                    reason,
                });
            }
        };

        Ok(Self {
            client,
            navigation_timeout: config.navigation_timeout(),
            attached: config.attach_to.is_some(),
        })
    }

    /// User agent the browser actually reports
    pub async fn user_agent(&self) -> Option<String> {
        match self.client.execute("return navigator.userAgent;", vec![]).await {
            Ok(Value::String(ua)) => Some(ua),
            Ok(_) => None,
            Err(e) => {
                ::log::debug!("Could not read navigator.userAgent: {}", e);
                None
            }
        }
    }

    /// Cookies of the current browsing context, for downloads made outside the browser
    pub async fn cookies(&self) -> Vec<SessionCookie> {
        match self.client.get_all_cookies().await {
            Ok(cookies) => cookies
                .iter()
                .map(|c| SessionCookie {
                    domain: c.domain().map(|d| d.trim_start_matches('.').to_string()),
                    name: c.name().to_string(),
                    value: c.value().to_string(),
                })
                .collect(),
            Err(e) => {
                ::log::warn!("Could not read browser cookies: {}", e);
                Vec::new()
            }
        }
    }

    /// Opens an HTML file and prints it to PDF bytes
    pub async fn render_pdf(&mut self, html_path: &Path) -> Result<Vec<u8>, BrowserError> {
        let absolute = std::path::absolute(html_path).map_err(|e| {
            BrowserError::Render(format!("cannot resolve {}: {}", html_path.display(), e))
        })?;
        let file_url = Url::from_file_path(&absolute).map_err(|_| {
            BrowserError::Render(format!("cannot build a file URL for {}", absolute.display()))
        })?;

        self.navigate(file_url.as_str()).await?;

        let print = PrintConfiguration::builder()
            .size(PrintSize {
                width: 21.59,
                height: 27.94,
            })
            .margins(PrintMargins {
                top: 1.8,
                bottom: 1.8,
                left: 1.4,
                right: 1.4,
            })
            .background(true)
            .build()
            .map_err(|e| BrowserError::Render(format!("{:?}", e)))?;

        self.client
            .print(print)
            .await
            .map_err(|e| BrowserError::Render(e.to_string()))
    }

    /// Ends the session unless it is attached to an external browser
    pub async fn close(self) {
        if self.attached {
            ::log::debug!("Leaving attached browser session open");
            return;
        }
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close browser session: {}", e);
        }
    }

    async fn wait_until_ready(&self) -> Result<(), BrowserError> {
        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await
                .map_err(|e| BrowserError::command("waiting for the page to settle", e))?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            sleep(SETTLE_POLL).await;
        }
    }
}

impl Browser for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let started = Instant::now();
        let limit = self.navigation_timeout;

        let loaded = timeout(limit, async {
            self.client
                .goto(url)
                .await
                .map_err(|e| BrowserError::command(&format!("loading {}", url), e))?;
            self.wait_until_ready().await
        })
        .await;

        match loaded {
            Ok(result) => {
                ::log::debug!(
                    "Loaded {} in {:.2} seconds",
                    url,
                    started.elapsed().as_secs_f64()
                );
                result
            }
            Err(_) => Err(BrowserError::Timeout(limit)),
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, BrowserError> {
        let value = self
            .client
            .execute(SNAPSHOT_SCRIPT, vec![])
            .await
            .map_err(|e| BrowserError::command("reading the page", e))?;

        serde_json::from_value(value).map_err(|e| BrowserError::MalformedSnapshot(e.to_string()))
    }
}

/// Chrome capabilities for a launched or attached browser
fn build_capabilities(config: &ScraperConfig) -> Map<String, Value> {
    let chrome_options = match &config.attach_to {
        Some(address) => json!({ "debuggerAddress": address }),
        None => {
            let profile = std::path::absolute(&config.profile_dir)
                .unwrap_or_else(|_| config.profile_dir.clone());
            let mut args = vec![
                format!("--user-data-dir={}", profile.display()),
                "--window-size=1280,720".to_string(),
                format!("--user-agent={}", config.user_agent),
            ];
            if config.headless {
                args.push("--headless=new".to_string());
            }
            json!({ "args": args })
        }
    };

    let mut capabilities = Map::new();
    capabilities.insert("browserName".to_string(), json!("chrome"));
    capabilities.insert("goog:chromeOptions".to_string(), chrome_options);
    capabilities
}

/// Connects to the WebDriver instance, trying common local ports if the configured one fails
async fn connect_to_webdriver(
    webdriver_url: &str,
    capabilities: &Map<String, Value>,
) -> Result<Client, String> {
    let first_error = match ClientBuilder::native()
        .capabilities(capabilities.clone())
        .connect(webdriver_url)
        .await
    {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e.to_string()
        }
    };

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native()
            .capabilities(capabilities.clone())
            .connect(url)
            .await
        {
            ::log::info!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    Err(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_capabilities() {
        let config = ScraperConfig {
            headless: true,
            ..ScraperConfig::default()
        };
        let caps = build_capabilities(&config);
        assert_eq!(caps["browserName"], "chrome");

        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(
            args.iter()
                .any(|a| a.as_str().unwrap().starts_with("--user-data-dir="))
        );
    }

    #[test]
    fn test_attach_capabilities_only_carry_debugger_address() {
        let config = ScraperConfig {
            attach_to: Some("127.0.0.1:9222".to_string()),
            ..ScraperConfig::default()
        };
        let caps = build_capabilities(&config);
        let options = &caps["goog:chromeOptions"];
        assert_eq!(options["debuggerAddress"], "127.0.0.1:9222");
        assert!(options.get("args").is_none());
    }
}
