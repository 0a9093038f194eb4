//! Document assembly: one offline HTML file out of the collected pages.

use crate::error::{Result, ScrapeError};
use crate::results::ScrapedPage;
use crate::utils::escape_html;
use chrono::NaiveDateTime;
use scraper::{Html, Selector};
use std::path::Path;

/// Title used when no page provides one
pub const DEFAULT_TITLE: &str = "Walkthrough";

const STYLESHEET: &str = r#"
:root { --text: #111; --muted: #555; --link: #1a56db; }
@page { margin: 18mm 14mm; }
* { box-sizing: border-box; }
body { font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; color: var(--text); line-height: 1.45; }
a { color: var(--link); text-decoration: none; }
.cover { margin-bottom: 18px; padding-bottom: 12px; border-bottom: 1px solid #ddd; }
.cover h1 { font-size: 26px; margin: 0 0 6px 0; }
.cover .meta { font-size: 12px; }
.page { page-break-before: always; break-before: page; }
.page h1 { font-size: 22px; margin: 0 0 6px 0; }
.meta { color: var(--muted); font-size: 11px; margin-bottom: 10px; }
.content img { max-width: 100%; height: auto; }
.content pre, .content code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 12px; }
.content pre { white-space: pre-wrap; background: #f6f6f6; padding: 10px; border-radius: 6px; }
.content table { border-collapse: collapse; width: 100%; }
.content th, .content td { border: 1px solid #ddd; padding: 6px; vertical-align: top; }
"#;

/// Cover information of an assembled document
#[derive(Debug, Clone)]
pub struct Cover<'a> {
    pub title: &'a str,
    pub start_url: &'a str,
    pub generated_at: NaiveDateTime,
}

/// Title of the first page that has one, else [`DEFAULT_TITLE`]
pub fn document_title(pages: &[ScrapedPage]) -> String {
    pages
        .iter()
        .map(|p| p.title.trim())
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

/// Assembles the offline document.
///
/// Pure function of its inputs: a cover section, then one section per page
/// in order, each labelled `i/n` with its source. Titles and URLs are
/// escaped; content fragments are embedded as-is. `base_href` adds a
/// `<base>` so relative references left in the fragments still resolve.
pub fn build_document(cover: &Cover<'_>, pages: &[ScrapedPage], base_href: Option<&str>) -> String {
    let total = pages.len();
    let mut html = String::new();

    html.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    if let Some(base) = base_href {
        html.push_str(&format!("<base href=\"{}\">\n", escape_html(base)));
    }
    html.push_str(&format!("<title>{}</title>\n", escape_html(cover.title)));
    html.push_str(&format!("<style>{}</style>\n", STYLESHEET));
    html.push_str("</head>\n<body>\n");

    html.push_str(&format!(
        "<section class=\"cover\">\n<h1>{}</h1>\n<div class=\"meta\">Generated {} &bull; Start: {}</div>\n</section>\n",
        escape_html(cover.title),
        cover.generated_at.format("%Y-%m-%d %H:%M"),
        source_link(cover.start_url),
    ));

    for (i, page) in pages.iter().enumerate() {
        html.push_str(&format!(
            "<section class=\"page\">\n<h1>{}</h1>\n<div class=\"meta\">{}/{} &bull; {}</div>\n<div class=\"content\">{}</div>\n</section>\n",
            escape_html(&page.title),
            i + 1,
            total,
            source_link(&page.url),
            page.content_html,
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn source_link(url: &str) -> String {
    let escaped = escape_html(url);
    format!("<a href=\"{}\">{}</a>", escaped, escaped)
}

/// Pages from a folder of manually saved `.html`/`.htm` files.
///
/// Files are ordered by name, ignoring case. Each page takes its title from
/// `<title>` (else the file stem) and its content from `<body>`.
pub fn pages_from_saved_folder(dir: &Path) -> Result<Vec<ScrapedPage>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
        if is_html && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ScrapeError::NoSavedPages(dir.to_path_buf()));
    }

    files.sort_by_key(|path| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });

    let mut pages = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(&path)?;
        let raw = String::from_utf8_lossy(&bytes);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (title, content_html) = saved_page_parts(&raw);
        ::log::debug!("Loaded saved page {}", name);
        pages.push(ScrapedPage::new(
            name,
            title.unwrap_or(stem),
            content_html,
        ));
    }

    Ok(pages)
}

fn saved_page_parts(raw: &str) -> (Option<String>, String) {
    let document = Html::parse_document(raw);

    let title = Selector::parse("title")
        .ok()
        .and_then(|s| document.select(&s).next().map(|t| t.text().collect::<String>()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let content = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next().map(|body| body.inner_html()))
        .unwrap_or_else(|| document.html());

    (title, content)
}
