use super::RenderedPage;
use super::html::{select_first, selector, visible_text, visible_text_len};
use crate::results::ExtractionResult;
use dom_query::{Document, Selection};
use scraper::ElementRef;
use url::Url;

/// Generic content containers, in priority order
pub const CONTENT_SELECTORS: [&str; 11] = [
    "main",
    "article",
    "[role=main]",
    "#content",
    ".content",
    "#main",
    ".main",
    ".faqtext",
    "#faqtext",
    ".post_content",
    ".entry-content",
];

/// Noise removed from the captured container
const NOISE_SELECTOR: &str = "script,style,noscript,nav,footer,header,aside,form,button";

/// Attributes holding references that must survive outside the page
const REFERENCE_ATTRS: [&str; 2] = ["href", "src"];

struct Candidate<'a> {
    selector: String,
    element: ElementRef<'a>,
    text_len: usize,
}

/// Extracts the main content of a rendered page.
///
/// Tries `selector_override` first, then [`CONTENT_SELECTORS`]; the match with
/// the most visible text wins, earlier candidates winning ties. When no
/// selector matches, the largest `<div>` is used. The chosen subtree is
/// copied, stripped of noise, and every `href`/`src` is made absolute.
/// A page with no candidate yields empty content, not an error.
pub fn extract(page: &RenderedPage, selector_override: Option<&str>) -> ExtractionResult {
    let title = page_title(page);

    let Some(chosen) = choose_container(page, selector_override) else {
        ::log::debug!("No content container found on {}", page.url);
        return ExtractionResult {
            title,
            ..ExtractionResult::default()
        };
    };

    ::log::debug!(
        "Chose {:?} ({} chars) on {}",
        chosen.selector,
        chosen.text_len,
        page.url
    );

    ExtractionResult {
        title,
        content_html: clean_fragment(
            &chosen.element.html(),
            chosen.element.value().name(),
            &page.url,
        ),
        selector: chosen.selector,
        text_len: chosen.text_len,
    }
}

fn choose_container<'a>(
    page: &'a RenderedPage,
    selector_override: Option<&str>,
) -> Option<Candidate<'a>> {
    let mut best: Option<Candidate<'a>> = None;

    let selectors = selector_override
        .into_iter()
        .chain(CONTENT_SELECTORS.iter().copied());

    for css in selectors {
        if css.trim().is_empty() {
            continue;
        }
        let Some(element) = select_first(&page.document, css) else {
            continue;
        };
        let text_len = visible_text_len(element);
        if best.as_ref().is_none_or(|b| text_len > b.text_len) {
            best = Some(Candidate {
                selector: css.to_string(),
                element,
                text_len,
            });
        }
    }

    if best.is_none() {
        best = largest_div(page);
    }

    best
}

fn largest_div(page: &RenderedPage) -> Option<Candidate<'_>> {
    let divs = selector("div")?;
    let mut best: Option<Candidate<'_>> = None;

    for element in page.document.select(&divs) {
        let text_len = visible_text_len(element);
        if best.as_ref().is_none_or(|b| text_len > b.text_len) {
            best = Some(Candidate {
                selector: "div".to_string(),
                element,
                text_len,
            });
        }
    }

    best
}

/// Page `<h1>` text, else document title, else URL path
fn page_title(page: &RenderedPage) -> String {
    let heading = select_first(&page.document, "h1")
        .map(visible_text)
        .unwrap_or_default();
    if !heading.is_empty() {
        return heading;
    }

    let title = page.title.trim();
    if !title.is_empty() {
        return title.to_string();
    }

    page.url.path().to_string()
}

/// Inner HTML of a copied container, without noise and with absolute references.
///
/// `outer_html` is the container itself and `root_tag` its element name.
/// Table parts are re-parsed inside the table context they need, so rows
/// and cells keep their markup.
pub fn clean_fragment(outer_html: &str, root_tag: &str, base: &Url) -> String {
    let (open, close) = table_context(root_tag);
    let doc = Document::from(format!(
        "<html><head></head><body>{}{}{}</body></html>",
        open, outer_html, close
    ));

    doc.select(NOISE_SELECTOR).remove();

    for attr in REFERENCE_ATTRS {
        for node in doc.select(&format!("[{}]", attr)).nodes() {
            let element = Selection::from(*node);
            let Some(value) = element.attr(attr) else {
                continue;
            };
            if let Some(absolute) = absolutize_reference(&value, base) {
                element.set_attr(attr, &absolute);
            }
        }
    }

    // Wrappers never share the root's tag, so the first match is the root
    let root = match root_tag {
        "html" | "body" => doc.select("body"),
        _ => doc.select("body").select(root_tag).first(),
    };
    root.inner_html().to_string()
}

fn table_context(tag: &str) -> (&'static str, &'static str) {
    match tag {
        "td" | "th" => ("<table><tbody><tr>", "</tr></tbody></table>"),
        "tr" => ("<table><tbody>", "</tbody></table>"),
        "tbody" | "thead" | "tfoot" | "caption" | "colgroup" => ("<table>", "</table>"),
        _ => ("", ""),
    }
}

/// Absolute form of a reference, or `None` for in-page anchors, `mailto:`,
/// `javascript:` targets and anything that does not parse
pub fn absolutize_reference(value: &str, base: &Url) -> Option<String> {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || lowered.starts_with("mailto:")
        || lowered.starts_with("javascript:")
    {
        return None;
    }

    base.join(trimmed).ok().map(String::from)
}
