//! Asset localization.
//!
//! Makes an assembled document usable offline: remote images (including
//! lazy-load and source-set variants, and `url(...)` references in inline
//! styles) are downloaded once each into an `assets/` folder and the
//! references are rewritten to local relative paths.

pub mod fetch;
pub mod srcset;

pub use fetch::{AssetFetcher, FetchedAsset, HttpFetcher, SessionCookie};

use crate::error::Result;
use dom_query::{Document, Selection};
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use srcset::{LAZY_ATTRS, SRCSET_ATTRS, best_image_url, looks_like_placeholder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

/// Folder under the output directory receiving downloaded files
pub const ASSET_SUBDIR: &str = "assets";

/// Only these references are ever downloaded
pub const ALLOWED_PREFIXES: [&str; 2] = ["http://", "https://"];

static STYLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:'([^']*)'|"([^"]*)"|([^'")]*))\s*\)"#)
        .expect("static regex is valid")
});

/// Remote URL to local relative path. Entries are never replaced.
#[derive(Debug, Default)]
pub struct AssetMap {
    entries: HashMap<String, String>,
}

impl AssetMap {
    pub fn get(&self, remote: &str) -> Option<&str> {
        self.entries.get(remote).map(String::as_str)
    }

    /// Records a download. Returns false, keeping the old entry, if the URL is known.
    pub fn insert(&mut self, remote: String, local: String) -> bool {
        if self.entries.contains_key(&remote) {
            return false;
        }
        self.entries.insert(remote, local);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Downloads and rewrites the assets of HTML documents into one output directory
pub struct Localizer<F> {
    fetcher: F,
    output_dir: PathBuf,
    assets: AssetMap,
}

impl<F: AssetFetcher> Localizer<F> {
    pub fn new(fetcher: F, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            assets: AssetMap::default(),
        }
    }

    /// Localizes the assets of `html`, returning the rewritten HTML and the
    /// number of files downloaded by this call.
    ///
    /// Download failures leave the affected reference untouched. Only
    /// failing to create the asset folder is an error.
    pub async fn localize(&mut self, html: &str) -> Result<(String, usize)> {
        let references = collect_references(html);
        if references.is_empty() {
            return Ok((html.to_string(), 0));
        }

        let assets_dir = self.output_dir.join(ASSET_SUBDIR);
        tokio::fs::create_dir_all(&assets_dir).await?;

        let mut downloaded = 0;
        for remote in references {
            if self.assets.get(&remote).is_some() {
                continue;
            }
            if let Some(local) = self.download(&remote, &assets_dir).await {
                self.assets.insert(remote, local);
                downloaded += 1;
            }
        }

        ::log::info!(
            "Localized {} new assets into {} ({} known)",
            downloaded,
            assets_dir.display(),
            self.assets.len()
        );

        Ok((rewrite_references(html, &self.assets), downloaded))
    }

    async fn download(&self, remote: &str, assets_dir: &Path) -> Option<String> {
        let asset = match self.fetcher.fetch(remote).await {
            Ok(asset) => asset,
            Err(e) => {
                ::log::warn!("Skipping asset {}: {}", remote, e);
                return None;
            }
        };

        let extension = choose_extension(remote, asset.content_type.as_deref());
        let name = asset_file_name(remote, &extension);
        if let Err(e) = tokio::fs::write(assets_dir.join(&name), &asset.body).await {
            ::log::warn!("Failed to save asset {} as {}: {}", remote, name, e);
            return None;
        }

        ::log::debug!("Saved {} ({} bytes) as {}", remote, asset.body.len(), name);
        Some(format!("{}/{}", ASSET_SUBDIR, name))
    }
}

/// Download candidate behind an image element, if it is eligible
fn image_reference(element: &Selection) -> Option<String> {
    best_image_url(|name| element.attr(name).map(|v| v.to_string())).and_then(eligible)
}

/// Filters out data URIs, placeholders and non-HTTP references;
/// protocol-relative references are read as HTTPS
fn eligible(reference: String) -> Option<String> {
    let reference = match reference.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => reference,
    };

    let lowered = reference.to_ascii_lowercase();
    if lowered.starts_with("data:") || looks_like_placeholder(&reference) {
        return None;
    }
    if !ALLOWED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }
    Some(reference)
}

fn style_reference(caps: &Captures<'_>) -> Option<String> {
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    if raw.is_empty() {
        return None;
    }
    eligible(raw.to_string())
}

/// Distinct eligible references in document order
pub fn collect_references(html: &str) -> Vec<String> {
    let doc = Document::from(html);
    let mut references: Vec<String> = Vec::new();
    let mut push = |reference: String| {
        if !references.contains(&reference) {
            references.push(reference);
        }
    };

    for node in doc.select("img").nodes() {
        if let Some(reference) = image_reference(&Selection::from(*node)) {
            push(reference);
        }
    }

    for node in doc.select("[style]").nodes() {
        let Some(style) = Selection::from(*node).attr("style") else {
            continue;
        };
        for caps in STYLE_URL.captures_iter(&style) {
            if let Some(reference) = style_reference(&caps) {
                push(reference);
            }
        }
    }

    references
}

/// Points every downloaded reference at its local copy
pub fn rewrite_references(html: &str, assets: &AssetMap) -> String {
    let doc = Document::from(html);

    for node in doc.select("img").nodes() {
        let img = Selection::from(*node);
        let Some(local) = image_reference(&img).and_then(|r| assets.get(&r)) else {
            continue;
        };
        img.set_attr("src", local);
        for attr in LAZY_ATTRS.iter().chain(SRCSET_ATTRS.iter()) {
            img.remove_attr(attr);
        }
    }

    for node in doc.select("[style]").nodes() {
        let element = Selection::from(*node);
        let Some(style) = element.attr("style") else {
            continue;
        };
        let rewritten = STYLE_URL.replace_all(&style, |caps: &Captures<'_>| {
            match style_reference(caps).and_then(|r| assets.get(&r)) {
                Some(local) => format!("url('{}')", local),
                None => caps[0].to_string(),
            }
        });
        if &*rewritten != &*style {
            element.set_attr("style", &rewritten);
        }
    }

    doc.html().to_string()
}

/// File extension from the URL path, else the media type, else `.bin`
pub fn choose_extension(url: &str, content_type: Option<&str>) -> String {
    let from_path = Url::parse(url).ok().and_then(|parsed| {
        Path::new(parsed.path())
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() < 10)
            .map(|e| format!(".{}", e))
    });
    if let Some(extension) = from_path {
        return extension;
    }

    let from_type = match content_type.unwrap_or_default() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/avif" => ".avif",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        _ => ".bin",
    };
    from_type.to_string()
}

/// Deterministic local file name derived from a hash of the source URL
pub fn asset_file_name(url: &str, extension: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    let extension = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    };
    format!("asset-{}{}", &digest[..24], extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::Mutex;

    /// Serves canned bodies and records every request
    #[derive(Default)]
    struct MockFetcher {
        responses: HashMap<String, FetchedAsset>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn serving(urls: &[(&str, Option<&str>)]) -> Self {
            let responses = urls
                .iter()
                .map(|(url, content_type)| {
                    (
                        url.to_string(),
                        FetchedAsset {
                            content_type: content_type.map(str::to_string),
                            body: format!("bytes of {}", url).into_bytes(),
                        },
                    )
                })
                .collect();
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AssetFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<FetchedAsset, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    fn doc(body: &str) -> String {
        format!("<html><head></head><body>{}</body></html>", body)
    }

    #[tokio::test]
    async fn test_repeated_reference_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::serving(&[("https://img.test/map.png", Some("image/png"))]);
        let mut localizer = Localizer::new(fetcher, dir.path());

        let html = doc(&r#"<img src="https://img.test/map.png">"#.repeat(5));
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 1);
        assert_eq!(localizer.fetcher.calls(), vec!["https://img.test/map.png"]);

        let local = asset_file_name("https://img.test/map.png", ".png");
        let expected = format!(r#"src="assets/{}""#, local);
        assert_eq!(out.matches(&expected).count(), 5);
        assert!(!out.contains("https://img.test/map.png"));

        let saved = std::fs::read(dir.path().join(ASSET_SUBDIR).join(&local)).unwrap();
        assert_eq!(saved, b"bytes of https://img.test/map.png");
    }

    #[tokio::test]
    async fn test_data_uris_and_placeholders_are_never_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let mut localizer = Localizer::new(MockFetcher::default(), dir.path());

        let html = doc(
            r#"<img src="data:image/png;base64,iVBORw0KGgo=">
               <img src="https://img.test/spacer.gif">
               <img src="https://img.test/1x1.gif">
               <img src="https://img.test/t/pixel">
               <img src="/relative/only.png">
               <div style="background: url(data:image/gif;base64,R0lGOD)"></div>"#,
        );
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 0);
        assert!(localizer.fetcher.calls().is_empty());
        assert_eq!(out, html);
    }

    #[tokio::test]
    async fn test_lazy_and_srcset_attributes_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::serving(&[("https://img.test/c.jpg", None)]);
        let mut localizer = Localizer::new(fetcher, dir.path());

        let html = doc(
            r#"<img src="https://img.test/spacer.gif" srcset="https://img.test/a.jpg 400w, https://img.test/b.jpg 800w, https://img.test/c.jpg 2x" data-srcset="x">"#,
        );
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 1);
        assert_eq!(localizer.fetcher.calls(), vec!["https://img.test/c.jpg"]);
        assert!(out.contains(&asset_file_name("https://img.test/c.jpg", ".jpg")));
        assert!(!out.contains("srcset"));
        assert!(!out.contains("spacer.gif"));
    }

    #[tokio::test]
    async fn test_protocol_relative_lazy_source() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::serving(&[("https://img.test/road.webp", None)]);
        let mut localizer = Localizer::new(fetcher, dir.path());

        let html = doc(r#"<img data-src="//img.test/road.webp" src="/img/spacer.gif">"#);
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 1);
        assert!(!out.contains("data-src"));
        assert!(out.contains(".webp\""));
    }

    #[tokio::test]
    async fn test_rerun_on_local_content_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::serving(&[
            ("https://img.test/a.png", None),
            ("https://img.test/bg.jpg", None),
        ]);
        let mut localizer = Localizer::new(fetcher, dir.path());

        let html = doc(
            r#"<img src="https://img.test/a.png"><div style="background-image: url('https://img.test/bg.jpg')"></div>"#,
        );
        let (first, downloaded) = localizer.localize(&html).await.unwrap();
        assert_eq!(downloaded, 2);

        let fresh = MockFetcher::default();
        let mut second_pass = Localizer::new(fresh, dir.path());
        let (second, downloaded) = second_pass.localize(&first).await.unwrap();
        assert_eq!(downloaded, 0);
        assert!(second_pass.fetcher.calls().is_empty());
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_reference_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut localizer = Localizer::new(MockFetcher::default(), dir.path());

        let html = doc(r#"<img src="https://img.test/missing.png" data-src="https://img.test/missing.png">"#);
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 0);
        assert_eq!(localizer.fetcher.calls().len(), 1);
        assert!(out.contains(r#"src="https://img.test/missing.png""#));
        assert!(out.contains("data-src"));
        assert_eq!(localizer.assets.len(), 0);
    }

    #[tokio::test]
    async fn test_inline_style_urls() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::serving(&[("https://img.test/bg.jpg", Some("image/jpeg"))]);
        let mut localizer = Localizer::new(fetcher, dir.path());

        let html = doc(
            r#"<div style="background: url(&quot;https://img.test/bg.jpg&quot;) no-repeat; border: 0"></div>
               <img src="https://img.test/bg.jpg">"#,
        );
        let (out, downloaded) = localizer.localize(&html).await.unwrap();

        assert_eq!(downloaded, 1);
        let local = format!("assets/{}", asset_file_name("https://img.test/bg.jpg", ".jpg"));
        assert!(out.contains(&format!("url('{}') no-repeat", local)));
        assert!(out.contains(&format!(r#"src="{}""#, local)));
    }

    #[test]
    fn test_asset_map_is_append_once() {
        let mut map = AssetMap::default();
        assert!(map.insert("https://a".to_string(), "assets/1".to_string()));
        assert!(!map.insert("https://a".to_string(), "assets/2".to_string()));
        assert_eq!(map.get("https://a"), Some("assets/1"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_choose_extension() {
        assert_eq!(choose_extension("https://x.test/a/b.PNG?w=3", None), ".PNG");
        assert_eq!(
            choose_extension("https://x.test/image", Some("image/webp")),
            ".webp"
        );
        assert_eq!(
            choose_extension("https://x.test/a.verylongextension", Some("image/gif")),
            ".gif"
        );
        assert_eq!(choose_extension("https://x.test/image", None), ".bin");
        assert_eq!(
            choose_extension("https://x.test/image", Some("text/html")),
            ".bin"
        );
    }

    #[test]
    fn test_asset_file_name_is_deterministic() {
        let a = asset_file_name("https://x.test/a.png", ".png");
        assert_eq!(a, asset_file_name("https://x.test/a.png", "png"));
        assert_ne!(a, asset_file_name("https://x.test/b.png", ".png"));
        assert!(a.starts_with("asset-"));
        assert_eq!(a.len(), "asset-".len() + 24 + ".png".len());
    }

    #[test]
    fn test_collect_references_in_order() {
        let html = doc(
            r#"<img src="https://x.test/1.png"><p style="background:url(https://x.test/2.png)"></p><img src="https://x.test/1.png">"#,
        );
        assert_eq!(
            collect_references(&html),
            vec!["https://x.test/1.png", "https://x.test/2.png"]
        );
    }
}
