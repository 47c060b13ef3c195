//! Work body extraction: raw work-page HTML → clean literary text.
//!
//! Two strategies exist behind the [`ExtractStrategy`] seam: the precise
//! marker-delimited extractor (the archive embeds fixed comment markers
//! around each work's body) and a heuristic paragraph scraper kept as a
//! configurable fallback for pages without markers.

mod strategy;

pub use strategy::{ExtractStrategy, HeuristicExtractor, MarkerExtractor, strategy_for};

/// Extracted text shorter than this is "no usable content": the candidate is
/// skipped with a warning, not treated as an error.
pub const MIN_TEXT_CHARS: usize = 20;

/// Whether extracted text clears the minimum-content threshold.
pub fn usable(text: &str) -> bool {
    text.chars().count() >= MIN_TEXT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_threshold_boundary() {
        // 19 chars: rejected. 20 chars: accepted.
        assert!(!usable(&"x".repeat(MIN_TEXT_CHARS - 1)));
        assert!(usable(&"x".repeat(MIN_TEXT_CHARS)));
    }

    #[test]
    fn usable_counts_chars_not_bytes() {
        // 20 Cyrillic chars are 40 bytes; still one char each.
        assert!(usable(&"ы".repeat(20)));
        assert!(!usable(&"ы".repeat(19)));
    }

    #[test]
    fn empty_text_is_not_usable() {
        assert!(!usable(""));
    }
}
