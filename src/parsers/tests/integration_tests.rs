use crate::browser::PageSnapshot;
use crate::filter::UrlSandbox;
use crate::parsers::{RenderedPage, extract, find_next, is_challenge};
use url::Url;

const WALKTHROUGH_PAGE: &str = r##"<!doctype html>
<html>
<head>
  <title>Chapter 1 - Some Game Walkthrough</title>
  <link rel="stylesheet" href="/static/site.css">
</head>
<body>
  <header class="site-header"><a href="/">Home</a><a href="/some-game/">Guide index</a></header>
  <nav class="topnav"><a href="/forums">Forums</a><a href="/some-game/Chapter_5">Next Game</a></nav>
  <div id="wrapper">
    <div id="faqtext">
      <h1>Chapter 1: The Road</h1>
      <p>Leave the village and follow the road <a href="Map">(map)</a>.</p>
      <img data-src="//img.example.com/road.png" src="/img/spacer.gif">
      <p>Defeat the wolves near the bridge.</p>
      <script>trackPageView();</script>
      <div class="pagination">
        <a href="/some-game/Prologue">« Previous</a>
        <a href="/some-game/Chapter_2">Next »</a>
      </div>
    </div>
    <aside class="ads">Buy now!</aside>
  </div>
  <footer><a href="mailto:staff@example.com">Contact</a></footer>
</body>
</html>"##;

fn rendered() -> RenderedPage {
    RenderedPage::parse(
        "https://www.example.com/some-game/Chapter_1",
        "Chapter 1 - Some Game Walkthrough",
        WALKTHROUGH_PAGE,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_faq_container() {
        let page = rendered();
        let result = extract(&page, None);

        assert_eq!(result.selector, "#faqtext");
        assert_eq!(result.title, "Chapter 1: The Road");
        assert!(result.text_len > 0);
        assert!(result.content_html.contains("Defeat the wolves"));
        assert!(!result.content_html.contains("trackPageView"));
        assert!(!result.content_html.contains("Buy now"));
        assert!(
            result
                .content_html
                .contains(r#"href="https://www.example.com/some-game/Map""#)
        );
        assert!(
            result
                .content_html
                .contains(r#"src="https://www.example.com/img/spacer.gif""#)
        );
        // Lazy-load attributes are left for the asset localizer.
        assert!(result.content_html.contains(r#"data-src="//img.example.com/road.png""#));
    }

    #[test]
    fn test_next_link_ignores_nav_noise() {
        let page = rendered();
        let sandbox = UrlSandbox::from_start_url(&page.url);

        let next = find_next(&page, &sandbox).unwrap();
        // "Next Game" in the top nav is inside the sandbox too, but scores
        // lower than the pager's "Next »".
        assert_eq!(
            next,
            Url::parse("https://www.example.com/some-game/Chapter_2").unwrap()
        );
    }

    #[test]
    fn test_real_page_is_not_a_challenge() {
        let snapshot = PageSnapshot::new(
            "https://www.example.com/some-game/Chapter_1",
            "Chapter 1 - Some Game Walkthrough",
            WALKTHROUGH_PAGE,
        );
        assert!(!is_challenge(&snapshot));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let page = rendered();
        assert_eq!(extract(&page, None), extract(&page, None));
        let sandbox = UrlSandbox::from_start_url(&page.url);
        assert_eq!(find_next(&page, &sandbox), find_next(&page, &sandbox));
    }
}
