//! Shared types, error model, and configuration for Anthology.
//!
//! This crate is the foundation depended on by all other Anthology crates.
//! It provides:
//! - [`AnthologyError`] — the unified error type
//! - Domain types ([`WorkCandidate`], [`WorkRecord`], [`RunSummary`])
//! - Identity and key derivation ([`source_id`], [`excerpt`], [`blob_key`])
//! - Configuration ([`AppConfig`], [`Secrets`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BlobConfig, IngestConfig, Secrets, SourceConfig, StorageConfig, TelegramConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{AnthologyError, Result};
pub use types::{
    EXCERPT_MAX_CHARS, EXCERPT_TRUNCATION_MARKER, RunSummary, WorkCandidate, WorkRecord, blob_key,
    excerpt, source_id,
};
