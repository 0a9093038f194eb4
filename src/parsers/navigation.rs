use super::RenderedPage;
use super::html::{attr_lower, selector};
use crate::filter::{UrlSandbox, normalize_url};
use scraper::ElementRef;
use url::Url;

/// An anchor must score above this to count as a "next" link
pub const SCORE_THRESHOLD: i32 = 10;

/// Score assigned to anchors that may never be chosen
pub const EXCLUDED: i32 = i32::MIN;

const REL_NEXT: i32 = 100;
const TEXT_EXACT: i32 = 90;
const ARIA_EXACT: i32 = 80;
const TITLE_NEXT: i32 = 70;
const TEXT_CONTAINS: i32 = 60;
const ARIA_CONTAINS: i32 = 50;
const PAGINATION_SYMBOL: i32 = 50;
const CLASS_NEXT: i32 = 40;
const PAGER_ANCESTOR: i32 = 25;

/// How many ancestors are checked for a pagination container
const ANCESTOR_DEPTH: usize = 4;

const PAGINATION_SYMBOLS: [&str; 5] = ["›", "»", ">", "next »", "› next"];

/// Finds the URL of the next page, or `None` when there is no confident candidate.
///
/// An explicit `rel="next"` on a `<link>` or `<a>` wins outright when it stays
/// inside the sandbox. Otherwise every anchor is scored and the best one is
/// accepted only above [`SCORE_THRESHOLD`]. Anchors leaving the sandbox or
/// pointing back at the current page are never returned.
pub fn find_next(page: &RenderedPage, sandbox: &UrlSandbox) -> Option<Url> {
    let current = normalize_url(&page.url);

    if let Some(url) = explicit_next(page, sandbox, &current) {
        ::log::debug!("rel=next hint on {} points to {}", page.url, url);
        return Some(url);
    }

    let anchors = selector("a[href]")?;
    let mut best: Option<(Url, i32)> = None;

    for anchor in page.document.select(&anchors) {
        let Some(url) = anchor_url(page, anchor) else {
            continue;
        };
        let score = score_anchor(anchor, &url, sandbox, &current);
        if score == EXCLUDED {
            continue;
        }
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((url, score));
        }
    }

    match best {
        Some((url, score)) if score > SCORE_THRESHOLD => {
            ::log::debug!("Best next candidate {} scored {}", url, score);
            Some(url)
        }
        Some((url, score)) => {
            ::log::debug!(
                "Best next candidate {} scored {}, below threshold",
                url,
                score
            );
            None
        }
        None => None,
    }
}

fn explicit_next(page: &RenderedPage, sandbox: &UrlSandbox, current: &Url) -> Option<Url> {
    let hints = selector(r#"link[rel~="next"][href], a[rel~="next"][href]"#)?;
    page.document
        .select(&hints)
        .filter_map(|hint| anchor_url(page, hint))
        .find(|url| is_candidate(url, sandbox, current))
}

fn anchor_url(page: &RenderedPage, element: ElementRef<'_>) -> Option<Url> {
    let href = element.value().attr("href")?;
    if href.trim().is_empty() {
        return None;
    }
    page.resolve(href)
}

fn is_candidate(url: &Url, sandbox: &UrlSandbox, current: &Url) -> bool {
    sandbox.allows(url) && normalize_url(url) != *current
}

/// Weighted "next page" signals of one anchor
pub fn score_anchor(anchor: ElementRef<'_>, url: &Url, sandbox: &UrlSandbox, current: &Url) -> i32 {
    if !is_candidate(url, sandbox, current) {
        return EXCLUDED;
    }

    let text = anchor
        .text()
        .collect::<String>()
        .trim()
        .to_lowercase();
    let aria = attr_lower(anchor, "aria-label");
    let rel = attr_lower(anchor, "rel");
    let class = attr_lower(anchor, "class");
    let title = attr_lower(anchor, "title");

    let mut score = 0;
    if rel.contains("next") {
        score += REL_NEXT;
    }
    if aria == "next" {
        score += ARIA_EXACT;
    } else if aria.contains("next") {
        score += ARIA_CONTAINS;
    }
    if title.contains("next") {
        score += TITLE_NEXT;
    }
    if text == "next" {
        score += TEXT_EXACT;
    }
    if text.contains("next") {
        score += TEXT_CONTAINS;
    }
    if PAGINATION_SYMBOLS.contains(&text.as_str()) {
        score += PAGINATION_SYMBOL;
    }
    if class.contains("next") {
        score += CLASS_NEXT;
    }
    if in_pagination_container(anchor) {
        score += PAGER_ANCESTOR;
    }

    score
}

fn in_pagination_container(anchor: ElementRef<'_>) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(ANCESTOR_DEPTH)
        .any(|parent| {
            let class = attr_lower(parent, "class");
            let id = attr_lower(parent, "id");
            class.contains("pagination")
                || class.contains("pager")
                || class.contains("nav")
                || id.contains("pagination")
                || id.contains("pager")
        })
}
