use crate::utils::collapse_whitespace;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text never shows up on screen
const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements that break lines when rendered
const BLOCK_TAGS: [&str; 22] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "p", "section", "tr",
];

/// Parse a selector, logging and discarding invalid ones
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            ::log::warn!("Ignoring invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

/// First element matching `css`
pub fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    doc.select(&selector).next()
}

/// Whitespace-collapsed visible text of an element
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_visible_text(element, &mut raw);
    collapse_whitespace(&raw)
}

/// Length in characters of the whitespace-collapsed visible text
pub fn visible_text_len(element: ElementRef<'_>) -> usize {
    visible_text(element).chars().count()
}

fn push_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_visible_text(child_el, out);
                }
                if BLOCK_TAGS.contains(&name) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Whitespace-collapsed visible text of the whole `<body>`
pub fn body_text(doc: &Html) -> String {
    select_first(doc, "body")
        .map(visible_text)
        .unwrap_or_default()
}

/// Lowercased, trimmed attribute value (empty when missing)
pub fn attr_lower(element: ElementRef<'_>, name: &str) -> String {
    element
        .value()
        .attr(name)
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_default()
}
