//! End-to-end ingestion pipeline: index → candidates → blobs → records → announcements.
//!
//! The job is a strictly sequential batch: candidates are processed one at a
//! time in discovery order, bounded by the configured batch cap, with a small
//! delay around publish calls and per-candidate failures to respect the
//! messaging endpoint's rate limits.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use anthology_blob::FsBlobStore;
use anthology_discovery::{build_client, discover_works, fetch_html, fetch_index};
use anthology_extract::{ExtractStrategy, strategy_for, usable};
use anthology_publish::Announcer;
use anthology_shared::{
    AnthologyError, AppConfig, Result, RunSummary, Secrets, WorkCandidate, WorkRecord, blob_key,
    excerpt, expand_home, source_id,
};
use anthology_storage::{InsertOutcome, Storage};

// ---------------------------------------------------------------------------
// IngestContext
// ---------------------------------------------------------------------------

/// Process-scoped context: expensive handles created once at startup and
/// passed to every pipeline step. No ambient globals.
pub struct IngestContext {
    /// Application configuration, read once per run.
    pub config: AppConfig,
    /// Shared HTTP client for index and work fetches.
    pub client: Client,
    /// Metadata store.
    pub storage: Storage,
    /// Blob store for full work texts.
    pub blobs: FsBlobStore,
    /// Telegram announcer.
    pub announcer: Announcer,
    /// Configured extraction strategy.
    pub strategy: Box<dyn ExtractStrategy>,
}

impl IngestContext {
    /// Construct the context from config and resolved secrets.
    ///
    /// Opens the metadata store (connection failure is fatal) and builds the
    /// single HTTP client reused for every fetch and announcement.
    pub async fn from_config(config: AppConfig, secrets: &Secrets) -> Result<Self> {
        let client = build_client(config.ingest.http_timeout_secs)?;
        let db_path = expand_home(&config.storage.db_path)?;
        let storage = Storage::open(&db_path).await?;
        let blobs = FsBlobStore::from_config(&config.blob, secrets.blob_sign_secret.clone())?;
        let announcer = Announcer::new(client.clone(), &config.telegram, secrets);
        let strategy = strategy_for(&config.source);

        Ok(Self {
            config,
            client,
            storage,
            blobs,
            announcer,
            strategy,
        })
    }

    fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.config.ingest.rate_limit_ms)
    }
}

/// Outcome of processing one candidate.
enum Ingested {
    /// A new record was stored (announced or not).
    New,
    /// Already ingested, or lost the insert race: nothing to do.
    Known,
    /// Extracted text below the usable threshold.
    Unusable,
}

// ---------------------------------------------------------------------------
// Run orchestration
// ---------------------------------------------------------------------------

/// Run one full ingestion pass and return its summary.
///
/// Seed-page fetch failure aborts the run; per-candidate failures from the
/// work fetch onward are caught here, logged with url/title context, and
/// skipped. The summary's `new` counts only works actually committed to the
/// metadata store.
#[instrument(skip_all, fields(seed = %ctx.config.source.seed_url))]
pub async fn run_ingest(ctx: &IngestContext) -> Result<RunSummary> {
    let run_id = ctx.storage.insert_ingest_run().await?;

    let seed_url = Url::parse(&ctx.config.source.seed_url)
        .map_err(|e| AnthologyError::config(format!("invalid seed_url: {e}")))?;

    let index_html = match fetch_index(&ctx.client, &seed_url).await {
        Ok(html) => html,
        Err(e) => {
            // Fatal: no candidates can be produced. Close the run record
            // before propagating.
            let stats = serde_json::json!({"status": "failed", "error": e.to_string()});
            let _ = ctx.storage.finish_ingest_run(&run_id, &stats.to_string()).await;
            return Err(e);
        }
    };

    let candidates = discover_works(&index_html, &seed_url);
    info!(count = candidates.len(), "candidate links discovered");

    let cap = ctx.config.ingest.batch_cap;
    let mut new_count = 0usize;
    let mut skipped_known = 0usize;
    let mut skipped_unusable = 0usize;
    let mut failed = 0usize;

    for candidate in &candidates {
        if new_count == cap {
            info!(cap, "batch cap reached, remaining candidates left for a future run");
            break;
        }

        match ingest_candidate(ctx, candidate).await {
            Ok(Ingested::New) => new_count += 1,
            Ok(Ingested::Known) => skipped_known += 1,
            Ok(Ingested::Unusable) => skipped_unusable += 1,
            Err(e) => {
                warn!(
                    url = %candidate.url,
                    title = %candidate.title,
                    error = %e,
                    "candidate failed, skipping"
                );
                failed += 1;
                tokio::time::sleep(ctx.rate_limit()).await;
            }
        }
    }

    // Best-effort retry of earlier stored-but-unannounced records.
    let swept = match publish_pending(ctx).await {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "pending-publish sweep failed");
            0
        }
    };

    let stats = serde_json::json!({
        "status": "done",
        "new": new_count,
        "candidates": candidates.len(),
        "skipped_known": skipped_known,
        "skipped_unusable": skipped_unusable,
        "failed": failed,
        "swept": swept,
    });
    ctx.storage.finish_ingest_run(&run_id, &stats.to_string()).await?;

    info!(new = new_count, skipped_known, failed, "run complete");
    Ok(RunSummary::done(new_count))
}

/// Process a single candidate through novelty check, fetch, extraction,
/// persistence, and announcement.
async fn ingest_candidate(ctx: &IngestContext, candidate: &WorkCandidate) -> Result<Ingested> {
    let sid = source_id(candidate.url.as_str());

    if ctx.storage.find_work(&sid).await?.is_some() {
        debug!(title = %candidate.title, "already ingested, skipping");
        return Ok(Ingested::Known);
    }

    let html = fetch_html(&ctx.client, &candidate.url).await?;
    let text = ctx.strategy.extract(&html);

    if !usable(&text) {
        warn!(
            url = %candidate.url,
            title = %candidate.title,
            chars = text.chars().count(),
            "empty or very short text, skipping"
        );
        return Ok(Ingested::Unusable);
    }

    // Blob first: a record must never reference a missing blob. If the
    // metadata insert fails after this, the orphaned blob is accepted
    // collateral.
    let scraped_at = Utc::now();
    let key = blob_key(&ctx.config.blob.key_prefix, &candidate.title, scraped_at);
    ctx.blobs.put(&key, &text)?;

    let record = WorkRecord {
        source_id: sid,
        title: candidate.title.clone(),
        url: candidate.url.to_string(),
        blob_key: key,
        excerpt: excerpt(&text),
        scraped_at,
        published: false,
        published_at: None,
    };

    match ctx.storage.insert_work(&record).await? {
        InsertOutcome::Inserted => {}
        InsertOutcome::AlreadyExists => {
            // A concurrent run won the race between our novelty check and
            // this insert. Its record stands; our blob is orphaned.
            info!(title = %record.title, "record already exists, lost novelty race");
            return Ok(Ingested::Known);
        }
    }

    // The work is stored either way now; announcement failure leaves the
    // record unpublished for the sweep to retry.
    tokio::time::sleep(ctx.rate_limit()).await;
    if let Err(e) = announce_record(ctx, &record).await {
        warn!(
            title = %record.title,
            error = %e,
            "announcement failed, record stays unpublished"
        );
    }

    Ok(Ingested::New)
}

/// Announce one stored record and mark it published on success.
async fn announce_record(ctx: &IngestContext, record: &WorkRecord) -> Result<()> {
    let link = ctx.blobs.signed_url(&record.blob_key, Utc::now())?;
    ctx.announcer
        .announce(&record.title, &record.excerpt, &link)
        .await?;
    ctx.storage.mark_published(&record.source_id, Utc::now()).await?;
    info!(title = %record.title, "announced");
    Ok(())
}

/// Re-announce works stored by earlier runs whose delivery failed.
///
/// The novelty check conflates "seen" with "announced", so it never retries
/// these; this sweep queries `published = false` directly. Returns the number
/// of works announced.
#[instrument(skip_all)]
pub async fn publish_pending(ctx: &IngestContext) -> Result<usize> {
    let pending = ctx.storage.list_unpublished().await?;
    if pending.is_empty() {
        return Ok(0);
    }

    info!(count = pending.len(), "retrying unannounced works");
    let mut announced = 0usize;

    for record in &pending {
        tokio::time::sleep(ctx.rate_limit()).await;
        match announce_record(ctx, record).await {
            Ok(()) => announced += 1,
            Err(e) => {
                warn!(title = %record.title, error = %e, "retry failed, left pending");
            }
        }
    }

    Ok(announced)
}
