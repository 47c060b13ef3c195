//! Marker-delimited extraction.
//!
//! The archive wraps each work's body in a pair of fixed comment markers.
//! Extracting only the region between them excludes the site's header,
//! footer, and rating chrome, which sit structurally outside the markers.

use tracing::debug;

use super::{ExtractStrategy, cleanup, visible_text};

/// Extracts the text between two fixed boundary comments in the raw HTML.
pub struct MarkerExtractor {
    start: String,
    end: String,
}

impl MarkerExtractor {
    /// Create an extractor for the given boundary markers.
    pub fn new(start: String, end: String) -> Self {
        Self { start, end }
    }

    /// Locate the delimited region in the raw HTML, if present.
    fn delimited_region<'a>(&self, html: &'a str) -> Option<&'a str> {
        let start_idx = html.find(&self.start)? + self.start.len();
        let rest = &html[start_idx..];
        let end_idx = rest.find(&self.end)?;
        Some(&rest[..end_idx])
    }
}

impl ExtractStrategy for MarkerExtractor {
    fn extract(&self, html: &str) -> String {
        match self.delimited_region(html) {
            Some(region) => cleanup(&visible_text(region)),
            None => {
                debug!("boundary markers not found");
                String::new()
            }
        }
    }

    fn name(&self) -> &str {
        "marker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_shared::SourceConfig;

    fn extractor() -> MarkerExtractor {
        let source = SourceConfig::default();
        MarkerExtractor::new(source.start_marker, source.end_marker)
    }

    fn wrap(body: &str) -> String {
        let source = SourceConfig::default();
        format!(
            "<html><body><h2>Chrome title</h2>{}{}{}<small>Rating chrome</small></body></html>",
            source.start_marker, body, source.end_marker
        )
    }

    #[test]
    fn extracts_exactly_the_delimited_text() {
        let html = wrap("<dd>Line one</dd><dd>Line two</dd>");
        assert_eq!(extractor().extract(&html), "Line one\nLine two");
    }

    #[test]
    fn excludes_boilerplate_outside_markers() {
        let html = wrap("<dd>Body</dd>");
        let text = extractor().extract(&html);
        assert!(!text.contains("Chrome title"));
        assert!(!text.contains("Rating chrome"));
    }

    #[test]
    fn missing_markers_yield_empty_text() {
        let html = "<html><body><dd>Body without markers</dd></body></html>";
        assert_eq!(extractor().extract(html), "");
    }

    #[test]
    fn missing_end_marker_yields_empty_text() {
        let source = SourceConfig::default();
        let html = format!("<html>{}<dd>Unterminated</dd></html>", source.start_marker);
        assert_eq!(extractor().extract(&html), "");
    }

    #[test]
    fn normalizes_non_breaking_spaces() {
        let html = wrap("<dd>устал от&nbsp;шума</dd>");
        assert_eq!(extractor().extract(&html), "устал от шума");
    }

    #[test]
    fn work_fixture_extracts_body_only() {
        let html = std::fs::read_to_string("../../../fixtures/html/work-marker.html")
            .expect("read fixture");
        let text = extractor().extract(&html);

        assert!(text.starts_with("Дождь начался под вечер"));
        assert!(text.contains("считая фонари"));
        assert!(text.ends_with("недописанное письмо."));
        assert!(!text.contains("Вернуться к списку"));
        assert!(!text.contains("Оценка"));
        assert_eq!(text.lines().count(), 3);
    }
}
