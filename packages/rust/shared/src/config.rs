//! Application configuration for Anthology.
//!
//! User config lives at `~/.anthology/anthology.toml`.
//! Secrets are never stored in the file — the config names the environment
//! variables that hold them, and [`Secrets::from_env`] resolves the values
//! once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnthologyError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "anthology.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".anthology";

// ---------------------------------------------------------------------------
// Config structs (matching anthology.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// The archive source being ingested.
    #[serde(default)]
    pub source: SourceConfig,

    /// Per-run ingestion limits.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Metadata store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Blob store settings.
    #[serde(default)]
    pub blob: BlobConfig,

    /// Telegram announcement settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// `[source]` section — the author page being watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// The fixed seed URL: the author's index page.
    #[serde(default = "default_seed_url")]
    pub seed_url: String,

    /// Extraction strategy: "marker" (delimited region) or "heuristic"
    /// (paragraph scraping fallback).
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Comment marker the site embeds before the work body.
    #[serde(default = "default_start_marker")]
    pub start_marker: String,

    /// Comment marker the site embeds after the work body.
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            seed_url: default_seed_url(),
            mode: default_mode(),
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
        }
    }
}

fn default_seed_url() -> String {
    "http://samlib.ru/editors/p/popow_p_p/".into()
}
fn default_mode() -> String {
    "marker".into()
}
fn default_start_marker() -> String {
    "<!-- --------- Собственно произведение ------------- -->".into()
}
fn default_end_marker() -> String {
    "<!-- ----------------------------------------------- -->".into()
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How many new works one run may process.
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,

    /// Timeout for each HTTP call, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Delay around publish calls and per-candidate failures, in ms.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_cap: default_batch_cap(),
            http_timeout_secs: default_http_timeout(),
            rate_limit_ms: default_rate_limit(),
        }
    }
}

fn default_batch_cap() -> usize {
    20
}
fn default_http_timeout() -> u64 {
    15
}
fn default_rate_limit() -> u64 {
    200
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.anthology/anthology.db".into()
}

/// `[blob]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Root directory for stored work texts.
    #[serde(default = "default_blob_root")]
    pub root_dir: String,

    /// Key prefix for work blobs (like an object-store folder).
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Public base URL for retrieval links. Empty means local `file://` links.
    #[serde(default)]
    pub public_base_url: String,

    /// Validity window for signed retrieval links, in seconds.
    #[serde(default = "default_link_ttl")]
    pub link_ttl_secs: u64,

    /// Name of the env var holding the link signing secret.
    #[serde(default = "default_sign_secret_env")]
    pub sign_secret_env: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root_dir: default_blob_root(),
            key_prefix: default_key_prefix(),
            public_base_url: String::new(),
            link_ttl_secs: default_link_ttl(),
            sign_secret_env: default_sign_secret_env(),
        }
    }
}

fn default_blob_root() -> String {
    "~/.anthology/blobs".into()
}
fn default_key_prefix() -> String {
    "works".into()
}
fn default_link_ttl() -> u64 {
    86_400
}
fn default_sign_secret_env() -> String {
    "ANTHOLOGY_BLOB_SECRET".into()
}

/// `[telegram]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Name of the env var holding the bot token (never the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Name of the env var holding the destination chat id.
    #[serde(default = "default_chat_id_env")]
    pub chat_id_env: String,

    /// Telegram API base URL (overridable for tests).
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            chat_id_env: default_chat_id_env(),
            api_base: default_api_base(),
        }
    }
}

fn default_token_env() -> String {
    "ANTHOLOGY_TELEGRAM_TOKEN".into()
}
fn default_chat_id_env() -> String {
    "ANTHOLOGY_TELEGRAM_CHAT_ID".into()
}
fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Secret values resolved from the environment once per run at startup.
#[derive(Clone)]
pub struct Secrets {
    /// Telegram bot token.
    pub telegram_token: String,
    /// Destination chat/channel id.
    pub telegram_chat_id: String,
    /// Retrieval-link signing secret.
    pub blob_sign_secret: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret values.
        f.debug_struct("Secrets")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish_non_exhaustive()
    }
}

impl Secrets {
    /// Resolve all required secrets from the env vars named in `config`.
    /// A missing or empty variable is fatal for the run.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            telegram_token: require_env(&config.telegram.token_env)?,
            telegram_chat_id: require_env(&config.telegram.chat_id_env)?,
            blob_sign_secret: require_env(&config.blob.sign_secret_env)?,
        })
    }
}

fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(AnthologyError::config(format!(
            "required secret not found: set the {var_name} environment variable"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.anthology/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AnthologyError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.anthology/anthology.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AnthologyError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AnthologyError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AnthologyError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AnthologyError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AnthologyError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` in a configured path against the user's home.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| AnthologyError::config("could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}
