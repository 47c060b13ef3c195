//! Author index parser: raw HTML → ordered, deduplicated work candidates.
//!
//! The archive is an old-style site: the index page is a flat list of `<a>`
//! tags mixed with navigation chrome. We keep a link when it resolves inside
//! the author's namespace and has non-empty anchor text to serve as a title.

use std::collections::HashSet;

use anthology_shared::WorkCandidate;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// IndexScope
// ---------------------------------------------------------------------------

/// Determines which discovered URLs lie under the author's namespace.
///
/// Derived from the seed URL itself: same host, path prefixed by the seed
/// page's path. Navigation links to the rest of the site fall outside.
#[derive(Debug, Clone)]
pub struct IndexScope {
    base_host: String,
    base_path: String,
}

impl IndexScope {
    /// Build the scope from the author index URL.
    pub fn new(seed_url: &Url) -> Self {
        Self {
            base_host: seed_url.host_str().unwrap_or("").to_string(),
            base_path: seed_url.path().to_string(),
        }
    }

    /// Whether `url` belongs to the author's namespace.
    pub fn in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        if url.host_str().unwrap_or("") != self.base_host {
            return false;
        }
        url.path().starts_with(&self.base_path)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Parse the index page into candidates, in document order.
///
/// Relative hrefs are resolved against the seed URL; fragments are stripped.
/// Links with empty anchor text are discarded (no usable title), as are
/// duplicates by exact URL equality — the first occurrence's title wins.
pub fn discover_works(html: &str, seed_url: &Url) -> Vec<WorkCandidate> {
    let scope = IndexScope::new(seed_url);
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("anchor selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<WorkCandidate> = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        // Skip non-navigable hrefs outright.
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut url) = seed_url.join(href) else {
            debug!(href, "unresolvable href, skipping");
            continue;
        };
        url.set_fragment(None);

        if !scope.in_scope(&url) {
            continue;
        }

        let title = el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        if seen.insert(url.to_string()) {
            candidates.push(WorkCandidate { title, url });
        }
    }

    debug!(count = candidates.len(), "index parsed");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Url {
        Url::parse("http://samlib.ru/editors/p/popow_p_p/").unwrap()
    }

    #[test]
    fn scope_same_namespace() {
        let scope = IndexScope::new(&seed());

        let work = Url::parse("http://samlib.ru/editors/p/popow_p_p/story1.shtml").unwrap();
        assert!(scope.in_scope(&work));

        let other_author = Url::parse("http://samlib.ru/editors/q/other_q_q/story.shtml").unwrap();
        assert!(!scope.in_scope(&other_author));

        let other_host = Url::parse("http://example.com/editors/p/popow_p_p/x.shtml").unwrap();
        assert!(!scope.in_scope(&other_host));
    }

    #[test]
    fn discovers_relative_and_absolute_links() {
        let html = r#"<html><body>
            <a href="story1.shtml">Первый рассказ</a>
            <a href="http://samlib.ru/editors/p/popow_p_p/story2.shtml">Второй рассказ</a>
        </body></html>"#;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Первый рассказ");
        assert_eq!(
            candidates[0].url.as_str(),
            "http://samlib.ru/editors/p/popow_p_p/story1.shtml"
        );
        assert_eq!(candidates[1].title, "Второй рассказ");
    }

    #[test]
    fn discards_out_of_scope_links() {
        let html = r#"<html><body>
            <a href="/janrowiki/">Жанры</a>
            <a href="http://samlib.ru/">Самиздат</a>
            <a href="story1.shtml">Рассказ</a>
        </body></html>"#;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Рассказ");
    }

    #[test]
    fn discards_empty_anchor_text() {
        let html = r#"<html><body>
            <a href="story1.shtml"><img src="cover.gif"></a>
            <a href="story1.shtml">  </a>
            <a href="story2.shtml">Titled</a>
        </body></html>"#;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Titled");
    }

    #[test]
    fn dedup_keeps_first_seen_title_and_order() {
        let html = r#"<html><body>
            <a href="story1.shtml">First Title</a>
            <a href="story2.shtml">Middle</a>
            <a href="story1.shtml">Second Title</a>
        </body></html>"#;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "First Title");
        assert_eq!(candidates[1].title, "Middle");
    }

    #[test]
    fn strips_fragments_before_dedup() {
        let html = r#"<html><body>
            <a href="story1.shtml">Plain</a>
            <a href="story1.shtml#top">With Fragment</a>
        </body></html>"#;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Plain");
    }

    #[test]
    fn skips_mailto_and_javascript() {
        let html = r##"<html><body>
            <a href="mailto:author@samlib.ru">Write to the author</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="#comments">Comments</a>
            <a href="story1.shtml">Story</a>
        </body></html>"##;

        let candidates = discover_works(html, &seed());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn index_fixture_parses() {
        let html = std::fs::read_to_string("../../../fixtures/html/author-index.html")
            .expect("read fixture");
        let candidates = discover_works(&html, &seed());

        // The fixture carries 4 in-scope work links, one duplicated, plus
        // navigation chrome and an imaged link without anchor text.
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].title, "Осенний дождь");
        assert!(
            candidates
                .iter()
                .all(|c| c.url.path().starts_with("/editors/p/popow_p_p/"))
        );
    }

    #[test]
    fn novelty_decision_is_stable_across_parses() {
        let html = std::fs::read_to_string("../../../fixtures/html/author-index.html")
            .expect("read fixture");
        let first = discover_works(&html, &seed());
        let second = discover_works(&html, &seed());
        let first_urls: Vec<_> = first.iter().map(|c| c.url.as_str()).collect();
        let second_urls: Vec<_> = second.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(first_urls, second_urls);
    }
}
