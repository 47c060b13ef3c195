//! Filesystem blob store for extracted work texts.
//!
//! Each work's full text is written once under its generated key and never
//! mutated afterwards; the metadata store holds the only reference to it.
//! Retrieval links are time-limited: a signed URL under the configured public
//! base, or a plain `file://` URL in local-first mode.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use anthology_shared::{AnthologyError, BlobConfig, Result, expand_home};

/// Blob store rooted at a local directory.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
    sign_secret: String,
    link_ttl_secs: u64,
}

impl FsBlobStore {
    /// Build the store from config plus the resolved signing secret.
    pub fn from_config(config: &BlobConfig, sign_secret: String) -> Result<Self> {
        Ok(Self {
            root: expand_home(&config.root_dir)?,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            sign_secret,
            link_ttl_secs: config.link_ttl_secs,
        })
    }

    /// Build a store rooted at an explicit directory (tests, local tools).
    pub fn new(root: impl Into<PathBuf>, sign_secret: String, link_ttl_secs: u64) -> Self {
        Self {
            root: root.into(),
            public_base_url: String::new(),
            sign_secret,
            link_ttl_secs,
        }
    }

    /// Override the public base URL used for signed links.
    pub fn with_public_base_url(mut self, base: &str) -> Self {
        self.public_base_url = base.trim_end_matches('/').to_string();
        self
    }

    /// Write `text` under `key`. The blob is immutable: writing an existing
    /// key is an error, never an overwrite.
    pub fn put(&self, key: &str, text: &str) -> Result<()> {
        let path = self.path_for(key)?;

        if path.exists() {
            return Err(AnthologyError::Blob(format!(
                "blob already exists: {key}"
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AnthologyError::io(parent, e))?;
        }

        std::fs::write(&path, text.as_bytes()).map_err(|e| AnthologyError::io(&path, e))?;
        debug!(key, bytes = text.len(), "blob written");
        Ok(())
    }

    /// Read a blob back. Used by local tooling, not the ingestion path.
    pub fn get(&self, key: &str) -> Result<String> {
        let path = self.path_for(key)?;
        std::fs::read_to_string(&path).map_err(|e| AnthologyError::io(&path, e))
    }

    /// Produce a time-limited retrieval link for `key`.
    ///
    /// With a public base URL configured the link carries an expiry and a
    /// signature; without one (local-first mode) it is a plain `file://` URL.
    pub fn signed_url(&self, key: &str, now: DateTime<Utc>) -> Result<String> {
        let path = self.path_for(key)?;

        if self.public_base_url.is_empty() {
            return Ok(format!("file://{}", path.display()));
        }

        let expires = now.timestamp() + self.link_ttl_secs as i64;
        let sig = self.signature(key, expires);
        Ok(format!(
            "{}/{key}?expires={expires}&sig={sig}",
            self.public_base_url
        ))
    }

    /// Check a presented link signature against `key` and its expiry.
    pub fn verify(&self, key: &str, expires: i64, sig: &str, now: DateTime<Utc>) -> bool {
        now.timestamp() <= expires && self.signature(key, expires) == sig
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sign_secret.as_bytes());
        hasher.update(b"\n");
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Resolve a key to its on-disk path, rejecting traversal outside root.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || Path::new(key)
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AnthologyError::Blob(format!("invalid blob key: {key:?}")));
        }
        Ok(self.root.join(key))
    }
}
