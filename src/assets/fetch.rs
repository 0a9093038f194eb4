use crate::error::FetchError;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use std::time::Duration;
use url::Url;

/// Body and media type of a downloaded asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    /// Lowercased media type without parameters
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// HTTP GET capability used by the asset localizer.
///
/// Implementations report non-success statuses and empty bodies as errors.
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError>;
}

/// A cookie copied out of the browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie domain without a leading dot
    pub domain: Option<String>,
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    fn matches_host(&self, host: &str) -> bool {
        match &self.domain {
            Some(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
            None => false,
        }
    }
}

/// Downloads assets over HTTP with the browser's identity
pub struct HttpFetcher {
    client: reqwest::Client,
    referer: Option<String>,
    cookies: Vec<SessionCookie>,
}

impl HttpFetcher {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        referer: Option<String>,
        cookies: Vec<SessionCookie>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            referer,
            cookies,
        })
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies
    fn cookie_header(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches_host(host))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        let mut request = self.client.get(url);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }
        if let Some(cookie) = Url::parse(url).ok().and_then(|u| self.cookie_header(&u)) {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(FetchedAsset {
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(domain: Option<&str>, name: &str) -> SessionCookie {
        SessionCookie {
            domain: domain.map(str::to_string),
            name: name.to_string(),
            value: "1".to_string(),
        }
    }

    #[test]
    fn test_cookie_domain_matching() {
        assert!(cookie(Some("example.com"), "a").matches_host("example.com"));
        assert!(cookie(Some("example.com"), "a").matches_host("img.example.com"));
        assert!(!cookie(Some("example.com"), "a").matches_host("badexample.com"));
        assert!(!cookie(None, "a").matches_host("example.com"));
    }

    #[test]
    fn test_cookie_header_only_for_matching_hosts() {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(5),
            "test-agent",
            None,
            vec![
                cookie(Some("example.com"), "session"),
                cookie(Some("cdn.example.com"), "edge"),
                cookie(Some("tracker.test"), "t"),
            ],
        )
        .unwrap();

        let url = Url::parse("https://cdn.example.com/a.png").unwrap();
        assert_eq!(
            fetcher.cookie_header(&url).as_deref(),
            Some("session=1; edge=1")
        );

        let other = Url::parse("https://images.other.test/a.png").unwrap();
        assert_eq!(fetcher.cookie_header(&other), None);
    }
}
