use super::html::body_text;
use crate::browser::PageSnapshot;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static INTERSTITIAL_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bjust a moment\b").expect("static regex is valid"));

/// Phrases shown by verification interstitials, lowercased
const VERIFICATION_PHRASES: [&str; 3] = [
    "security verification",
    "verify you are not a bot",
    "checking your browser",
];

/// Whether the snapshot shows an anti-automation verification page.
///
/// Looks at the title first, then the visible body text. Missing or empty
/// title/body count as "not a challenge".
pub fn is_challenge(snapshot: &PageSnapshot) -> bool {
    if INTERSTITIAL_TITLE.is_match(&snapshot.title) {
        return true;
    }

    let text = match &snapshot.body_text {
        Some(text) => text.to_lowercase(),
        None if snapshot.html.is_empty() => return false,
        None => body_text(&Html::parse_document(&snapshot.html)).to_lowercase(),
    };

    VERIFICATION_PHRASES
        .iter()
        .any(|phrase| text.contains(phrase))
}
