//! Picking the one URL an `<img>` really points at.

/// Lazy-load attributes, checked before `src`
pub const LAZY_ATTRS: [&str; 5] = [
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-echo",
    "data-url",
];

/// Responsive source-set attributes
pub const SRCSET_ATTRS: [&str; 2] = ["srcset", "data-srcset"];

/// Width descriptors are divided by this so `800w` (0.8) compares sensibly with `2x`
const WIDTH_NORMALIZER: f64 = 1000.0;

/// Best source URL of an image element, given an attribute lookup.
///
/// Lazy-load attributes win, then the best source-set candidate, then a
/// non-placeholder `src`, then whatever `src` holds.
pub fn best_image_url<A>(attr: A) -> Option<String>
where
    A: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| {
        attr(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(lazy) = LAZY_ATTRS.iter().find_map(|name| non_empty(name)) {
        return Some(lazy);
    }

    if let Some(best) = SRCSET_ATTRS
        .iter()
        .find_map(|name| non_empty(name))
        .and_then(|srcset| pick_from_srcset(&srcset))
    {
        return Some(best);
    }

    non_empty("src")
}

/// Highest-scoring candidate of a source set; later entries win ties
pub fn pick_from_srcset(srcset: &str) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;

    for part in srcset.split(',') {
        let mut pieces = part.split_whitespace();
        let Some(url) = pieces.next() else {
            continue;
        };
        let score = pieces.next().map(descriptor_score).unwrap_or(0.0);

        if best.is_none_or(|(best_score, _)| score >= best_score) {
            best = Some((score, url));
        }
    }

    best.map(|(_, url)| url.to_string())
}

/// Score of a `2x` / `1.5x` / `640w` descriptor; unparseable descriptors score 0
fn descriptor_score(descriptor: &str) -> f64 {
    let (number, normalizer) = if let Some(width) = descriptor.strip_suffix('w') {
        (width, WIDTH_NORMALIZER)
    } else if let Some(density) = descriptor.strip_suffix('x') {
        (density, 1.0)
    } else {
        (descriptor, 1.0)
    };

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value / normalizer,
        _ => 0.0,
    }
}

/// Obvious placeholder pixels: 1x1 GIFs, spacers, tracking pixels
pub fn looks_like_placeholder(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    if lowered.starts_with("data:image/gif") || lowered.contains("1x1") {
        return true;
    }

    let path = lowered.split(['?', '#']).next().unwrap_or_default();
    let file_name = path.rsplit('/').next().unwrap_or_default();
    file_name.contains("spacer") || file_name.contains("pixel")
}
