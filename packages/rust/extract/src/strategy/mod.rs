//! Extraction strategy trait and built-in strategies.
//!
//! Strategies are selected by configuration (`[source].mode`), not detected
//! per page: the job targets one fixed site whose layout is known up front.

mod heuristic;
mod marker;

use anthology_shared::SourceConfig;
use scraper::Html;

pub use heuristic::HeuristicExtractor;
pub use marker::MarkerExtractor;

/// A strategy for extracting the literary body text from work-page HTML.
pub trait ExtractStrategy: Send + Sync {
    /// Extract visible body text with paragraph breaks preserved as newlines.
    /// Returns an empty string when no content region can be located.
    fn extract(&self, html: &str) -> String;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

/// Select the extraction strategy configured for the source.
///
/// `"heuristic"` picks the paragraph scraper; anything else gets the
/// marker-delimited extractor with the configured boundary comments.
pub fn strategy_for(source: &SourceConfig) -> Box<dyn ExtractStrategy> {
    match source.mode.as_str() {
        "heuristic" => Box::new(HeuristicExtractor),
        _ => Box::new(MarkerExtractor::new(
            source.start_marker.clone(),
            source.end_marker.clone(),
        )),
    }
}

/// Collect visible text from an HTML fragment, one line per text node.
///
/// Mirrors the archive's layout where each paragraph is its own element;
/// `script`/`style` contents are never visible text.
pub(crate) fn visible_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    let mut lines: Vec<String> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_invisible_element = node
            .parent()
            .and_then(|p| p.value().as_element().map(|el| el.name().to_string()))
            .is_some_and(|name| name == "script" || name == "style");
        if in_invisible_element {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}

/// Post-process extracted text: non-breaking spaces become ordinary spaces,
/// leading/trailing whitespace is trimmed.
pub(crate) fn cleanup(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_string()
}
