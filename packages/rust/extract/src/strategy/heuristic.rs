//! Heuristic paragraph extraction.
//!
//! The earlier, less precise approach: scrape the text of paragraph-like
//! elements across the whole page. Picks up navigation text on chrome-heavy
//! pages, which is why the marker strategy is the default, but still works
//! on mirrors that drop the boundary comments.

use scraper::{Html, Selector};

use super::{ExtractStrategy, cleanup};

/// Scrapes `<dd>` and `<p>` elements page-wide, one line per element.
pub struct HeuristicExtractor;

impl ExtractStrategy for HeuristicExtractor {
    fn extract(&self, html: &str) -> String {
        let doc = Html::parse_document(html);
        let para_sel = Selector::parse("dd, p").expect("paragraph selector");

        let lines: Vec<String> = doc
            .select(&para_sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        cleanup(&lines.join("\n"))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_paragraph_elements() {
        let html = "<html><body><dd>One</dd><p>Two</p><div>Not a paragraph</div></body></html>";
        assert_eq!(HeuristicExtractor.extract(html), "One\nTwo");
    }

    #[test]
    fn no_paragraphs_yield_empty_text() {
        let html = "<html><body><div>Only divs here</div></body></html>";
        assert_eq!(HeuristicExtractor.extract(html), "");
    }

    #[test]
    fn work_fixture_includes_body_paragraphs() {
        let html = std::fs::read_to_string("../../../fixtures/html/work-marker.html")
            .expect("read fixture");
        let text = HeuristicExtractor.extract(&html);
        assert!(text.contains("Дождь начался под вечер"));
        assert!(text.contains("недописанное письмо."));
    }
}
