//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use anthology_core::{IngestContext, publish_pending, run_ingest};
use anthology_shared::{
    AppConfig, Secrets, config_file_path, expand_home, init_config, load_config, load_config_from,
};
use anthology_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Anthology — archive author watcher and announcement bot.
#[derive(Parser)]
#[command(
    name = "anthology",
    version,
    about = "Ingest newly published works from a literary archive and announce them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.anthology/anthology.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one ingestion pass and print its JSON summary.
    Run,

    /// Retry announcements for stored-but-unannounced works.
    Sweep,

    /// List stored works.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Create a default config file.
    Init,
    /// Print the config file path.
    Path,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber from CLI flags.
///
/// `RUST_LOG` overrides the verbosity flag when set.
pub(crate) fn init_tracing(cli: &Cli) {
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command routing
// ---------------------------------------------------------------------------

/// Route and execute the parsed CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run => cmd_run(config).await,
        Command::Sweep => cmd_sweep(config).await,
        Command::List => cmd_list(config).await,
        Command::Config { action } => cmd_config(action),
    }
}

/// `anthology run` — one full ingestion pass.
async fn cmd_run(config: AppConfig) -> Result<()> {
    let secrets = Secrets::from_env(&config)?;
    let ctx = IngestContext::from_config(config, &secrets).await?;

    let summary = run_ingest(&ctx).await?;

    // The structured summary is the run's contract with its scheduler.
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// `anthology sweep` — retry pending announcements only.
async fn cmd_sweep(config: AppConfig) -> Result<()> {
    let secrets = Secrets::from_env(&config)?;
    let ctx = IngestContext::from_config(config, &secrets).await?;

    let announced = publish_pending(&ctx).await?;
    info!(announced, "sweep complete");

    println!(
        "{}",
        serde_json::json!({ "status": "done", "announced": announced })
    );
    Ok(())
}

/// `anthology list` — stored works, newest first. Needs no secrets.
async fn cmd_list(config: AppConfig) -> Result<()> {
    let db_path = expand_home(&config.storage.db_path)?;
    if !db_path.exists() {
        return Err(eyre!("no database at {} — run `anthology run` first", db_path.display()));
    }

    let storage = Storage::open(&db_path).await?;
    let works = storage.list_works().await?;

    if works.is_empty() {
        println!("No works stored yet.");
        return Ok(());
    }

    for work in works {
        let flag = if work.published { "announced" } else { "pending" };
        println!(
            "{}  {:9}  {}  {}",
            &work.source_id[..12],
            flag,
            work.scraped_at.format("%Y-%m-%d"),
            work.title
        );
    }
    Ok(())
}

/// `anthology config init|path`.
fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = init_config()?;
            println!("Created {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", config_file_path()?.display());
        }
    }
    Ok(())
}
