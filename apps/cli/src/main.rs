//! Anthology CLI — recurring ingestion job for a legacy literary archive.
//!
//! Watches one author's index page, stores newly published works, and
//! announces them through a Telegram bot.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
