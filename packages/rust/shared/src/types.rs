//! Core domain types for Anthology ingestion runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Maximum number of characters embedded in a record's excerpt.
pub const EXCERPT_MAX_CHARS: usize = 3500;

/// Marker appended when an excerpt is truncated.
pub const EXCERPT_TRUNCATION_MARKER: &str = "...";

/// Maximum length of the sanitized title portion of a blob key.
const BLOB_KEY_TITLE_MAX_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// WorkCandidate
// ---------------------------------------------------------------------------

/// A discovered (title, URL) pair not yet confirmed novel.
/// Transient — lives for one run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCandidate {
    /// Anchor text from the author index, used as the work's title.
    pub title: String,
    /// Absolute URL of the work page.
    pub url: Url,
}

// ---------------------------------------------------------------------------
// WorkRecord
// ---------------------------------------------------------------------------

/// Persisted metadata for one successfully ingested work.
///
/// A record is created unpublished immediately after its blob write succeeds.
/// Its only permitted mutation is the `published`/`published_at` transition
/// after a successful announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    /// SHA-256 of the work URL; primary dedup key.
    pub source_id: String,
    /// Title as discovered on the index page.
    pub title: String,
    /// Work page URL.
    pub url: String,
    /// Key of the stored full text in the blob store.
    pub blob_key: String,
    /// Bounded-length prefix of the extracted text for quick display.
    pub excerpt: String,
    /// When the text was extracted.
    pub scraped_at: DateTime<Utc>,
    /// Whether the work has been announced.
    pub published: bool,
    /// When the announcement succeeded, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Structured result of one ingestion run, returned to the invoking scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run status ("done" on completion).
    pub status: String,
    /// Count of newly stored works.
    pub new: usize,
}

impl RunSummary {
    /// A completed run that stored `new` works.
    pub fn done(new: usize) -> Self {
        Self {
            status: "done".into(),
            new,
        }
    }
}

// ---------------------------------------------------------------------------
// Identity and key derivation
// ---------------------------------------------------------------------------

/// Derive the stable source identifier for a work URL.
///
/// Pure function of the URL string: two runs observing the same URL always
/// compute the same id.
pub fn source_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute the excerpt embedded in a [`WorkRecord`].
///
/// Text of at most [`EXCERPT_MAX_CHARS`] characters is kept verbatim; longer
/// text is cut at that many characters with a truncation marker appended.
/// Counts characters, not bytes, so multi-byte text never splits mid-glyph.
pub fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    cut.push_str(EXCERPT_TRUNCATION_MARKER);
    cut
}

/// Derive the blob object key for a work.
///
/// The title is sanitized to an identifier-safe string (non-alphanumeric
/// characters become `_`), truncated, and suffixed with the extraction
/// timestamp so repeated titles still get unique keys.
pub fn blob_key(prefix: &str, title: &str, scraped_at: DateTime<Utc>) -> String {
    let safe_title: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(BLOB_KEY_TITLE_MAX_CHARS)
        .collect();
    let stamp = scraped_at.format("%Y%m%dT%H%M%SZ");
    format!("{prefix}/{safe_title}_{stamp}.txt")
}
